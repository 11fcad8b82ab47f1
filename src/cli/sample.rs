use anyhow::Result;

use crate::config::CopydeskConfig;
use crate::entities::SyntheticText;
use crate::orm::{Filter, Repository};

/// Print one randomly chosen stored text.
pub async fn sample(config: &CopydeskConfig) -> Result<()> {
    let store = super::connect_store(config).await?;
    let texts: Repository<SyntheticText> = Repository::new(store);

    match texts.find_one_random(&Filter::new()).await? {
        Some(record) => {
            if let Some(reference) = record.id.as_ref() {
                println!("{reference}");
                println!();
            }
            println!("{}", record.text);
        }
        None => println!("No stored copy yet."),
    }
    Ok(())
}
