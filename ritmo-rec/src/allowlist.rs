//! Artist allow-list
//!
//! Policy gate deciding which recognized songs are retained. Injected as an
//! immutable configuration value so tests can run with small fixtures; a
//! built-in list of Ecuadorian artists is the default.

/// Default allow-list: Ecuadorian artists across pasillo, tecnocumbia,
/// rock, Andean pop and the current urban scene.
pub const DEFAULT_ARTISTS: &[&str] = &[
    "Carmencita Lara",
    "Julio Jaramillo",
    "Carlota Jaramillo",
    "Toty Rodríguez",
    "Olga Gutiérrez",
    "Petita Palma",
    "Carlos Rubira Infante",
    "Dúo Benítez Valencia",
    "Don Medardo y sus Players",
    "Hermanos Miño Naranjo",
    "Las Alondras del Guayas",
    "Paulina Tamayo",
    "Hilda Murillo",
    "Margarita Laso",
    "Maria Tejada",
    "Juan Fernando Velasco",
    "Mirella Cesa",
    "Daniel Betancourth",
    "Fausto Miño",
    "Paola Navarrete",
    "Gabriela Villalba",
    "Pamela Cortés",
    "Ren Kai",
    "Verde 70",
    "Tranzas",
    "Lolabúm",
    "La Máquina Camaleón",
    "Sal y Mileto",
    "Da Pawn",
    "Mamá soy demente",
    "Guardarraya",
    "Krucs en Karnak",
    "AU-D",
    "Guanaco MC",
    "Mala Fama",
    "EVHA",
    "Gerardo",
    "Danilo Parra",
    "Swing Original Monks",
    "Nicola Cruz",
    "Quixosis",
    "Mateo Kingman",
    "Humazapas",
    "Fabrikante",
    "Sharon la Hechicera",
    "Delfín Quishpe",
    "Nelly Janeth",
    "Tamya Morán",
    "Mariela Condo",
    "Ricardo Pita",
    "Sudakaya",
    "Aladino",
    "Papa Chango",
    "Los Corrientes",
    "Mikrofon",
    "Marqués",
    "Daniel Beta",
    "Alex Ponce",
    "Los Chaucha Kings",
    "Playeros Kichwas",
    "Gustavo Velasquez",
    "Angel Velasquez",
    "Widinson",
    "Pepe Jaramillo",
    "Hermanas Mendoza Suasti",
    "Hermanas Sangurima",
    "Maxima Mejia",
    "Hermanos Nuñez",
    "Los Brillantes",
    "Duo Ecuador",
    "Jesus Vasquez",
    "Tito del Salto",
    "Kike Vega",
    "Irma Arauz",
    "Liliam Suarez",
    "Eduardo Brito",
    "Nicolas Fiallos",
    "Carlos Grijalva",
    "Alexandra Cabanilla",
    "Gerardo Moran",
    "La Toquilla",
    "Daniel Paez",
    "Fresia Saavedra",
    "Mélida Maria Jaramillo",
    "Consuelo Vargas",
    "Daniel Realpe",
    "Misquilla",
    "Segundo Rosero",
    "Chugo Tobar",
    "Roberto Calero",
    "Jenny Rosero",
    "Cecilio Alva",
    "Juanita Burbano",
    "Elias Vera",
    "Maximo Escaleras",
    "Fanny Jauch",
    "Jorge Luis del Hierro",
    "Edgar Palacios",
    "Martha Velasco",
    "Franklin Urrutia",
    "Los Hermanos Aymara",
    "Luis Aymara",
    "Polo Aymara",
    "Chinito del Ande",
    "Cecilia Canta",
    "Los Reales",
    "Las Chicas Dulces",
    "Rocola Bacalao",
    "Johann Vera",
    "Tres Dedos",
    "Munn",
    "Latorre",
    "Chloé Silva",
    "Norka",
    "Chris Naranjo",
    "Luigi Muletto",
    "George Levi",
    "Daniela Albán",
    "Jayac",
    "Jaime Enrique Aymara",
    "Jinsop",
    "Normita Navarro",
    "Mary Murillo",
    "Las Tres Marías",
    "Sendero",
    "Normita Arcos",
    "Olimpo Cárdenas",
    "José Ignacio Canelos",
    "Francisco Paredes Herrera",
    "Carlos Brito Benavides",
    "María de los Ángeles",
    "Chumichasqui",
    "Los Zhunaulas",
    "Azucena Aymara",
    "Hipatia Balseca",
    "Las Kautivas",
    "Bella Ilusión",
    "Encanto Latino",
    "Rumba Caliente",
    "Grupo Canela",
    "Jazmín la Tumbadora",
    "Sanyi",
    "Manolo",
    "Ricardo Suntaxi",
    "Jazmín Balseca",
    "Rosita Flores",
    "Cecy Narváez",
    "Bayron Caicedo",
    "Franklin Band",
    "Freddy Alexander",
    "Miriancita",
    "Lolita Echeverria",
    "Renn OG",
    "Jombriel",
    "Jorsh JMP",
    "Seich",
    "Maykel",
    "Peter V",
    "Diego Villacís",
    "Ceci Juno",
    "Letelefono",
    "Alkaloides",
    "Tonicamo",
    "Deslogin",
    "Entrañas",
    "KAIFO",
    "Minipony",
    "Gonzalo Ávila",
    "Luz Pinos",
    "Camila Pérez",
    "Fiebre",
];

/// Immutable set of known-artist names
///
/// Membership is case-insensitive symmetric containment: a candidate artist
/// matches when any entry is a substring of the candidate, or the candidate
/// is a substring of the entry. ANY matching entry wins; which one matched
/// is not recorded.
#[derive(Debug, Clone)]
pub struct ArtistAllowlist {
    /// Entries, lowercased once at construction
    entries: Vec<String>,
}

impl ArtistAllowlist {
    /// Build an allow-list from arbitrary entries
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// The built-in Ecuadorian artist list
    pub fn builtin() -> Self {
        Self::new(DEFAULT_ARTISTS)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are configured
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive symmetric-substring membership test
    pub fn matches(&self, candidate_artist: &str) -> bool {
        let candidate = candidate_artist.to_lowercase();
        self.entries
            .iter()
            .any(|entry| candidate.contains(entry) || entry.contains(&candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_case_insensitive() {
        let list = ArtistAllowlist::new(["Julio Jaramillo"]);
        assert!(list.matches("JULIO JARAMILLO"));
        assert!(list.matches("julio jaramillo"));
    }

    #[test]
    fn test_entry_substring_of_candidate() {
        // Listed short name contained in a longer recognized credit
        let list = ArtistAllowlist::new(["Julio Jaramillo"]);
        assert!(list.matches("Julio Jaramillo y Olimpo Cárdenas"));
    }

    #[test]
    fn test_candidate_substring_of_entry() {
        // Symmetric: "jaramillo" alone matches the listed full name
        let list = ArtistAllowlist::new(["Julio Jaramillo"]);
        assert!(list.matches("jaramillo"));
    }

    #[test]
    fn test_no_match() {
        let list = ArtistAllowlist::new(["Julio Jaramillo", "Tranzas"]);
        assert!(!list.matches("Daft Punk"));
    }

    #[test]
    fn test_builtin_list_is_populated() {
        let list = ArtistAllowlist::builtin();
        assert!(!list.is_empty());
        assert!(list.matches("Juan Fernando Velasco"));
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        let list = ArtistAllowlist::new(Vec::<String>::new());
        assert!(!list.matches("Julio Jaramillo"));
    }
}
