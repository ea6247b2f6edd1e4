//! Near-duplicate category detection.
//!
//! The same category shows up with different punctuation, spacing or a
//! phonetically equivalent spelling. Grouping is loose and can over-merge.

use std::collections::HashMap;

use pinyin::ToPinyin;
use serde::Serialize;
use tracing::info;

use crate::storage::Storage;
use crate::types::Category;
use crate::Result;

/// Normalized names at or below this edit distance are merged.
pub const MAX_EDIT_DISTANCE: usize = 2;

const STRIPPED: &[char] = &[
    '-', '_', '/', '\\', '·', '•', ',', '，', '。', '！', '？', '!', '?', '.', '、', '（', '）', '(', ')',
    '[', ']', '【', '】', '"', '“', '”', '\'', '‘', '’',
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeGroup {
    pub keep_id: i64,
    pub keep_name: String,
    pub merged_ids: Vec<i64>,
    pub merged_names: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub groups: Vec<MergeGroup>,
    pub merged: usize,
}

/// Trim, lowercase, and drop whitespace plus the half/full-width punctuation set.
pub fn normalize(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !STRIPPED.contains(c))
        .collect()
}

/// Han characters become the first letter of their pinyin, ASCII
/// alphanumerics are kept lowercased, anything else is dropped.
pub fn phonetic_initials(name: &str) -> String {
    name.trim()
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else {
                c.to_pinyin().and_then(|p| p.first_letter().chars().next())
            }
        })
        .collect()
}

pub fn find_duplicate_category_groups(categories: &[Category]) -> Vec<MergeGroup> {
    let mut keys: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<&Category>> = HashMap::new();
    for category in categories {
        let key = normalize(&category.name);
        buckets
            .entry(key.clone())
            .or_insert_with(|| {
                keys.push(key);
                Vec::new()
            })
            .push(category);
    }

    let initials: Vec<String> = keys
        .iter()
        .map(|key| phonetic_initials(&buckets[key][0].name))
        .collect();

    let mut visited = vec![false; keys.len()];
    let mut groups = Vec::new();
    for i in 0..keys.len() {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let mut members: Vec<&Category> = buckets[&keys[i]].clone();
        // Earlier buckets are all visited by now, so only later ones can join.
        for j in (i + 1)..keys.len() {
            if visited[j] {
                continue;
            }
            let same_sound = !initials[i].is_empty() && initials[i] == initials[j];
            if same_sound || strsim::levenshtein(&keys[i], &keys[j]) <= MAX_EDIT_DISTANCE {
                members.extend(buckets[&keys[j]].iter().copied());
                visited[j] = true;
            }
        }
        if let Some((keep, rest)) = members.split_first() {
            if !rest.is_empty() {
                groups.push(MergeGroup {
                    keep_id: keep.id,
                    keep_name: keep.name.clone(),
                    merged_ids: rest.iter().map(|c| c.id).collect(),
                    merged_names: rest.iter().map(|c| c.name.clone()).collect(),
                });
            }
        }
    }
    groups
}

/// Point stories of each merged category at the survivor, then delete the merged categories.
pub async fn apply_merge_groups<S: Storage + ?Sized>(storage: &S, groups: &[MergeGroup]) -> Result<usize> {
    let mut merged = 0;
    for group in groups {
        info!("🗂️ Keeping category [{}] {}", group.keep_id, group.keep_name);
        for (id, name) in group.merged_ids.iter().zip(&group.merged_names) {
            let moved = storage.reassign_category(name, &group.keep_name).await?;
            storage.delete_category(*id).await?;
            info!("  ↳ merged [{}] {} ({} stories moved)", id, name, moved);
            merged += 1;
        }
    }
    Ok(merged)
}

/// Find near-duplicate categories in `storage` and, unless `dry_run`, merge them.
pub async fn merge_duplicate_categories<S: Storage + ?Sized>(storage: &S, dry_run: bool) -> Result<MergeReport> {
    let categories = storage.list_categories().await?;
    let groups = find_duplicate_category_groups(&categories);
    if groups.is_empty() {
        info!("✨ No near-duplicate categories found");
        return Ok(MergeReport::default());
    }
    let merged = if dry_run {
        groups.iter().map(|g| g.merged_ids.len()).sum()
    } else {
        apply_merge_groups(storage, &groups).await?
    };
    Ok(MergeReport { groups, merged })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(names: &[&str]) -> Vec<Category> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Category { id: i as i64 + 1, name: name.to_string(), parent_id: None })
            .collect()
    }

    #[test]
    fn test_normalize_strips_spacing_and_punctuation() {
        assert_eq!(normalize("  Fairy Tales！ "), "fairytales");
        assert_eq!(normalize("【童话】"), "童话");
        assert_eq!(normalize("bed-time_stories."), "bedtimestories");
    }

    #[test]
    fn test_phonetic_initials() {
        assert_eq!(phonetic_initials("安徒生童话"), "atsth");
        assert_eq!(phonetic_initials("Fables 2"), "fables2");
        assert_eq!(phonetic_initials("！？"), "");
    }

    #[test]
    fn test_exact_normalized_match_groups() {
        let groups = find_duplicate_category_groups(&categories(&[
            "Fairy Tales",
            "Science Fiction Adventures",
            "fairy-tales",
        ]));
        assert_eq!(
            groups,
            vec![MergeGroup {
                keep_id: 1,
                keep_name: "Fairy Tales".to_string(),
                merged_ids: vec![3],
                merged_names: vec!["fairy-tales".to_string()],
            }]
        );
    }

    #[test]
    fn test_edit_distance_merges_close_spellings() {
        let groups = find_duplicate_category_groups(&categories(&["Folktales", "Mythology", "Folk tale"]));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].keep_name, "Folktales");
        assert_eq!(groups[0].merged_names, vec!["Folk tale".to_string()]);
    }

    #[test]
    fn test_pinyin_initials_merge_homophones() {
        let groups = find_duplicate_category_groups(&categories(&["安徒生童话", "Bedtime Stories", "暗途深塘湖"]));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].keep_id, 1);
        assert_eq!(groups[0].merged_ids, vec![3]);
    }

    #[test]
    fn test_distinct_categories_are_left_alone() {
        let groups = find_duplicate_category_groups(&categories(&[
            "Bedtime Stories",
            "Science Fiction",
            "Animal Fables",
        ]));
        assert!(groups.is_empty());
    }

    #[test]
    fn test_survivor_is_first_seen() {
        let mut cats = categories(&["Animal Fables", "animal fables", "Animal-Fables!"]);
        cats[0].id = 30;
        cats[1].id = 10;
        cats[2].id = 20;
        let groups = find_duplicate_category_groups(&cats);
        assert_eq!(groups[0].keep_id, 30);
        assert_eq!(groups[0].merged_ids, vec![10, 20]);
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let cats = categories(&[
            "Fairy Tales",
            "fairy tales",
            "Folktales",
            "Folk tale",
            "安徒生童话",
            "暗途深塘湖",
            "Science Fiction",
        ]);
        let groups = find_duplicate_category_groups(&cats);
        assert!(!groups.is_empty());

        let merged: Vec<i64> = groups.iter().flat_map(|g| g.merged_ids.clone()).collect();
        let survivors: Vec<Category> = cats.into_iter().filter(|c| !merged.contains(&c.id)).collect();
        assert!(find_duplicate_category_groups(&survivors).is_empty());
    }
}
