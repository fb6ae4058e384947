use anyhow::Result;
use tracing::info;

use crate::cli::ResolveArgs;
use crate::config::EvalConfig;

pub fn run(args: ResolveArgs) -> Result<()> {
    let config = EvalConfig::from_args(&args.benchmark)?;
    let resolver = config.resolver()?;
    let mut items = config.load_items()?;

    if let Some(item_id) = &args.item_id {
        items = vec![config.find_item(items, item_id)?];
    }

    let mut with_subtitles = 0_usize;
    for item in &items {
        let media = resolver.resolve(item)?;
        if media.subtitle.is_some() {
            with_subtitles += 1;
        }
        for video in &media.videos {
            info!(
                item_id = %item.question_id,
                video = %video.display(),
                subtitle = %media
                    .subtitle
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default(),
                "resolved media"
            );
        }
    }

    info!(
        items = items.len(),
        with_subtitles,
        "media resolution completed"
    );
    Ok(())
}
