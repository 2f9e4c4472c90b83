use std::fmt::Write;

/// Node properties the search is allowed to look at.
pub const SEARCHABLE_PROPERTIES: [&str; 6] =
    ["name", "text", "description", "disease", "symptom", "title"];

/// Upper bound on matched nodes per search.
pub const MAX_ENTITIES: usize = 5;

/// Name of the bound parameter carrying the search text.
pub const SEARCH_PARAM: &str = "query";

/// A case-insensitive substring search over [`SEARCHABLE_PROPERTIES`].
///
/// The Cypher text never contains the search text. It only refers to
/// `$query`, and the text travels as a bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityQuery {
    cypher: String,
    search_text: String,
}

impl EntityQuery {
    pub fn build(search_text: &str) -> Self {
        Self {
            cypher: cypher(),
            search_text: search_text.to_string(),
        }
    }

    pub fn cypher(&self) -> &str {
        &self.cypher
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn to_neo4rs(&self) -> neo4rs::Query {
        neo4rs::query(&self.cypher).param(SEARCH_PARAM, self.search_text.as_str())
    }
}

fn cypher() -> String {
    let predicates = SEARCHABLE_PROPERTIES
        .iter()
        .map(|p| {
            format!(
                "(n.{p} IS NOT NULL AND toLower(toString(n.{p})) CONTAINS toLower(${SEARCH_PARAM}))"
            )
        })
        .collect::<Vec<_>>()
        .join(" OR ");

    let mut cypher = String::from("MATCH (n)\n");
    // Writing to a `String` cannot fail.
    let _ = writeln!(cypher, "WHERE {predicates}");
    let _ = write!(cypher, "RETURN n LIMIT {MAX_ENTITIES}");
    cypher
}
