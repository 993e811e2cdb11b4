use serde::{Deserialize, Serialize};

/// Which fields of a matched document are returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    #[default]
    All,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Projection {
    /// Parse a `fields` parameter.
    ///
    /// A list made only of `-`-prefixed names excludes them. Otherwise the
    /// plain names form an inclusion and prefixed names are dropped, since an
    /// inclusion already leaves them out.
    pub fn parse(list: &str) -> Projection {
        let names: Vec<&str> = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "-")
            .collect();

        if names.is_empty() {
            return Projection::All;
        }

        if names.iter().all(|n| n.starts_with('-')) {
            return Projection::Exclude(names.iter().map(|n| n[1..].to_string()).collect());
        }

        Projection::Include(
            names
                .iter()
                .filter(|n| !n.starts_with('-'))
                .map(|n| n.to_string())
                .collect(),
        )
    }

    /// Add fields to leave out. Has no effect on an inclusion, which already
    /// names everything it returns.
    pub fn excluding(self, fields: &[&str]) -> Projection {
        match self {
            Projection::All => {
                Projection::Exclude(fields.iter().map(|f| f.to_string()).collect())
            }
            Projection::Exclude(mut existing) => {
                for f in fields {
                    if !existing.iter().any(|e| e == f) {
                        existing.push(f.to_string());
                    }
                }
                Projection::Exclude(existing)
            }
            include @ Projection::Include(_) => include,
        }
    }
}
