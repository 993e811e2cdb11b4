use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// `-price` sorts descending, `price` ascending.
    pub fn parse(item: &str) -> Option<Self> {
        let item = item.trim();
        match item.strip_prefix('-') {
            Some(field) if !field.is_empty() => Some(Sort::desc(field)),
            Some(_) => None,
            None if item.is_empty() => None,
            None => Some(Sort::asc(item)),
        }
    }

    /// Parse a comma separated list, keeping the order as precedence.
    pub fn parse_list(list: &str) -> Vec<Sort> {
        list.split(',').filter_map(Sort::parse).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefix_marks_descending() {
        assert_eq!(Sort::parse("-price"), Some(Sort::desc("price")));
        assert_eq!(Sort::parse(" name "), Some(Sort::asc("name")));
        assert_eq!(Sort::parse("-"), None);
        assert_eq!(Sort::parse(""), None);
    }

    #[test]
    fn parse_list_keeps_precedence() {
        let sorts = Sort::parse_list("-ratingsAverage,price,,");
        assert_eq!(
            sorts,
            vec![Sort::desc("ratingsAverage"), Sort::asc("price")]
        );
    }
}
