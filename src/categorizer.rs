use rusqlite::Connection;

use crate::error::Result;
use crate::models::IrregularRule;
use crate::store;

fn matches(description_lower: &str, pattern_lower: &str) -> bool {
    !pattern_lower.is_empty() && description_lower.contains(pattern_lower)
}

/// Maps transaction descriptions to at most one irregular category.
///
/// Rules are tried in ascending rule id; the first case-insensitive substring hit wins.
pub struct Matcher {
    rules: Vec<(i64, String)>,
}

impl Matcher {
    pub fn new(rules: &[IrregularRule]) -> Self {
        let mut active: Vec<&IrregularRule> = rules.iter().filter(|r| r.active).collect();
        active.sort_by_key(|r| r.id);
        Self {
            rules: active
                .into_iter()
                .map(|r| (r.category_id, r.pattern.to_lowercase()))
                .collect(),
        }
    }

    /// Rules of the account's active categories.
    pub fn for_account(conn: &Connection, account_id: i64) -> Result<Self> {
        Ok(Self::new(&store::active_rules(conn, account_id)?))
    }

    pub fn category_for(&self, description: &str) -> Option<i64> {
        let desc = description.to_lowercase();
        self.rules
            .iter()
            .find(|(_, pattern)| matches(&desc, pattern))
            .map(|(category_id, _)| *category_id)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

pub fn match_category_id(conn: &Connection, description: &str, account_id: i64) -> Result<Option<i64>> {
    Ok(Matcher::for_account(conn, account_id)?.category_for(description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;

    fn rule(id: i64, category_id: i64, pattern: &str) -> IrregularRule {
        IrregularRule { id, category_id, pattern: pattern.to_string(), active: true }
    }

    #[test]
    fn test_case_insensitive_substring() {
        let m = Matcher::new(&[rule(1, 10, "auto"), rule(2, 20, "dentist")]);
        assert_eq!(m.category_for("Paid AUTO shop"), Some(10));
        assert_eq!(m.category_for("dentist appointment"), Some(20));
        assert_eq!(m.category_for("unknown text"), None);
    }

    #[test]
    fn test_lowest_rule_id_wins() {
        let m = Matcher::new(&[rule(5, 20, "shop"), rule(2, 10, "auto")]);
        assert_eq!(m.category_for("auto shop"), Some(10));
    }

    #[test]
    fn test_inactive_and_empty_rules_never_match() {
        let mut inactive = rule(1, 10, "auto");
        inactive.active = false;
        let m = Matcher::new(&[inactive, rule(2, 20, "")]);
        assert_eq!(m.category_for("auto"), None);
    }

    #[test]
    fn test_match_category_id_from_db() {
        let (_dir, conn) = test_db();
        let auto = store::add_category(&conn, 1, "Auto", 120, 0.3).unwrap();
        let health = store::add_category(&conn, 1, "Health", 120, 0.3).unwrap();
        store::add_rule(&conn, auto, "auto").unwrap();
        store::add_rule(&conn, health, "dentist").unwrap();

        assert_eq!(match_category_id(&conn, "Paid AUTO shop", 1).unwrap(), Some(auto));
        assert_eq!(match_category_id(&conn, "dentist appointment", 1).unwrap(), Some(health));
        assert_eq!(match_category_id(&conn, "unknown", 1).unwrap(), None);
    }

    #[test]
    fn test_inactive_category_is_ignored() {
        let (_dir, conn) = test_db();
        let auto = store::add_category(&conn, 1, "Auto", 120, 0.3).unwrap();
        store::add_rule(&conn, auto, "auto").unwrap();
        store::set_category_active(&conn, auto, false).unwrap();
        assert_eq!(match_category_id(&conn, "auto parts", 1).unwrap(), None);
    }
}
