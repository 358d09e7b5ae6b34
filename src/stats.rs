//! Summary figures over a parsed import.
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use crate::leak::Import;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub lines_total: usize,
    pub users: usize,
    pub distinct_passwords: usize,
    pub platforms: usize,
    pub leakers: usize,
    pub rejected_lines: usize,
    pub accepted_percentage: String,
}

fn pct(n: usize, d: usize) -> String {
    if d == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", (n as f64) / (d as f64) * 100.0)
}

/// `lines_total` counts every line of the dump, including rejected ones.
pub fn import_stats(import: &Import, lines_total: usize, rejected_lines: usize) -> ImportStats {
    let passwords: HashSet<&str> = import
        .affected_users
        .values()
        .map(|c| c.password.as_str())
        .collect();
    ImportStats {
        lines_total,
        users: import.affected_users.len(),
        distinct_passwords: passwords.len(),
        platforms: import.affected_platforms.len(),
        leakers: import.leakers.len(),
        rejected_lines,
        accepted_percentage: pct(lines_total.saturating_sub(rejected_lines), lines_total),
    }
}

/// Most shared passwords among the affected users, as (password, users)
/// sorted by count descending then password ascending.
pub fn top_reused_passwords(import: &Import, top_n: usize) -> Vec<(String, usize)> {
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for creds in import.affected_users.values() {
        *freq.entry(creds.password.as_str()).or_insert(0) += 1;
    }
    let mut items: Vec<(String, usize)> = freq
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(pw, n)| (pw.to_string(), n))
        .collect();
    items.sort_by(|a, b| (Reverse(a.1), &a.0).cmp(&(Reverse(b.1), &b.0)));
    items.truncate(top_n);
    items
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::credential::{Credentials, Password, User};
    use crate::leak::{BadActor, DateInSeconds, Leak, Platform};

    pub(crate) fn import_of(pairs: &[(&str, &str)]) -> Import {
        Import {
            leak: Leak::new("paste site", DateInSeconds::parse("2024-01-15").unwrap()).unwrap(),
            affected_users: pairs
                .iter()
                .map(|(e, p)| {
                    (
                        User::new(e).unwrap(),
                        Credentials::new(Password::new(p).unwrap()),
                    )
                })
                .collect(),
            affected_platforms: vec![Platform::new("Unknown").unwrap()],
            leakers: vec![BadActor::new("anon").unwrap(), BadActor::new("crew").unwrap()],
        }
    }

    #[test]
    fn counts_users_passwords_and_rejections() {
        let import = import_of(&[
            ("a@x.com", "pass"),
            ("b@x.com", "pass"),
            ("c@x.com", "word"),
        ]);
        let s = import_stats(&import, 4, 1);
        assert_eq!(s.users, 3);
        assert_eq!(s.distinct_passwords, 2);
        assert_eq!(s.platforms, 1);
        assert_eq!(s.leakers, 2);
        assert_eq!(s.rejected_lines, 1);
        assert_eq!(s.accepted_percentage, "75.00%");
    }

    #[test]
    fn empty_dump_has_zero_percentage() {
        let s = import_stats(&import_of(&[]), 0, 0);
        assert_eq!(s.accepted_percentage, "0.00%");
    }

    #[test]
    fn top_reused_orders_by_count_then_password() {
        let import = import_of(&[
            ("a@x.com", "zzz"),
            ("b@x.com", "zzz"),
            ("c@x.com", "aaa"),
            ("d@x.com", "aaa"),
            ("e@x.com", "123456"),
            ("f@x.com", "123456"),
            ("g@x.com", "123456"),
            ("h@x.com", "unique"),
        ]);
        let top = top_reused_passwords(&import, 2);
        assert_eq!(
            top,
            vec![("123456".to_string(), 3), ("aaa".to_string(), 2)]
        );
        assert_eq!(top_reused_passwords(&import, 10).len(), 3);
    }
}
