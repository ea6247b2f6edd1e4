use sl_core::{CatalogStorage, NewStyle, Result};
use tracing::info;

/// Built-in picture-book illustration styles as `(name, description)`.
pub const BUILTIN_STYLES: [(&str, &str); 10] = [
    ("温暖童话", "色彩柔和，画风温馨，适合低幼儿童。"),
    ("幽默卡通", "夸张表情，明快线条，富有幽默感。"),
    ("史诗奇幻", "宏大场景，奇幻色彩，适合冒险故事。"),
    ("中国水墨", "水墨晕染，国风韵味，适合传统题材。"),
    ("现代扁平", "极简造型，明快配色，现代感强。"),
    ("童趣拼贴", "拼贴元素，丰富材质，童趣十足。"),
    ("科幻未来", "未来科技感，冷色调，适合科幻故事。"),
    ("油画质感", "厚重笔触，油画肌理，艺术感强。"),
    ("黑白剪影", "黑白对比，剪影风格，适合悬疑故事。"),
    ("欧美经典", "欧美绘本常见风格，细腻写实。"),
];

fn placeholder_image(name: &str) -> String {
    format!("https://placehold.co/120x80?text={}", name)
}

/// Inserts every built-in style whose name is not stored yet; returns how many were added.
pub async fn seed_styles<S: CatalogStorage + ?Sized>(storage: &S) -> Result<usize> {
    let existing: Vec<String> = storage.list_styles().await?.into_iter().map(|s| s.name).collect();
    let mut added = 0;
    for (name, desc) in BUILTIN_STYLES {
        if existing.iter().any(|n| n == name) {
            continue;
        }
        storage
            .insert_style(NewStyle {
                name: name.to_string(),
                desc: desc.to_string(),
                image: placeholder_image(name),
            })
            .await?;
        added += 1;
    }
    info!("🎨 Seeded {} styles", added);
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_storage::InMemoryStorage;

    #[tokio::test]
    async fn test_seed_styles_is_idempotent() {
        let storage = InMemoryStorage::new();
        storage
            .insert_style(NewStyle { name: "中国水墨".to_string(), ..Default::default() })
            .await
            .unwrap();

        assert_eq!(seed_styles(&storage).await.unwrap(), 9);
        assert_eq!(seed_styles(&storage).await.unwrap(), 0);

        let styles = storage.list_styles().await.unwrap();
        assert_eq!(styles.len(), 10);
        let warm = styles.iter().find(|s| s.name == "温暖童话").unwrap();
        assert_eq!(warm.image, "https://placehold.co/120x80?text=温暖童话");
    }
}
