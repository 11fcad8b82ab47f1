use anyhow::Result;

use crate::config::CopydeskConfig;
use crate::entities::SyntheticText;
use crate::orm::{Filter, FindOptions, Repository};

/// List stored copy, newest first.
pub async fn list(config: &CopydeskConfig, limit: u64, skip: u64) -> Result<()> {
    let store = super::connect_store(config).await?;
    let texts: Repository<SyntheticText> = Repository::new(store);

    let options = FindOptions {
        sort: vec![("created_at".to_string(), -1)],
        limit: Some(limit),
        skip: if skip > 0 { Some(skip) } else { None },
    };
    let records = texts.find(&Filter::new(), &options).await?;

    if records.is_empty() {
        println!("No stored copy yet.");
        return Ok(());
    }

    for record in &records {
        let id = record
            .id
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_default();
        println!(
            "{:<36} {}  {}",
            id,
            record.created_at.format("%Y-%m-%d %H:%M"),
            preview(&record.text, 80),
        );
    }
    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let clipped: String = flat.chars().take(max_chars).collect();
    format!("{clipped}...")
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_clips_on_char_boundaries() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("one\ntwo", 10), "one two");
        assert_eq!(preview("académie française", 8), "académie...");
    }
}
