use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Labels longer than `budget` characters keep `budget - 2` of them plus an
/// ellipsis, so truncated labels never exceed `budget + 1` characters.
pub fn truncate_label(name: &str, budget: usize) -> String {
    if name.chars().count() <= budget {
        return name.to_owned();
    }

    let keep = budget.saturating_sub(2);
    let mut label = name.chars().take(keep).collect::<String>();
    label.push_str("...");
    label
}

pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_labels_are_ellipsized() {
        assert_eq!(truncate_label("Dashboard", 12), "Dashboard");
        assert_eq!(truncate_label("Forgot Password", 12), "Forgot Pas...");
        assert_eq!(truncate_label("exactly12chr", 12), "exactly12chr");
        assert_eq!(truncate_label("ÄÖÜäöüÄÖÜäöüß", 12), "ÄÖÜäöüÄÖÜä...");
    }

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let first = stable_pair("element-1");
        assert_eq!(first, stable_pair("element-1"));
        assert!((-1.0..=1.0).contains(&first.0));
        assert!((-1.0..=1.0).contains(&first.1));
    }
}
