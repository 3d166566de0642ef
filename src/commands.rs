//! CLI command implementations

use anyhow::Context;
use std::path::Path;
use taxograph_core::Concept;
use taxograph_processor::{reindex_all, ChangeError, ProcessorConfig, TaxonomyChangeProcessor};
use taxograph_store::{load_snapshot, save_snapshot, ChangeSet, MemoryStore, StagingArea};

fn open_store(path: &Path) -> anyhow::Result<MemoryStore<Concept>> {
    let (header, store) = load_snapshot::<Concept>(path)
        .with_context(|| format!("cannot load snapshot {}", path.display()))?;
    tracing::info!(
        "Loaded {} concepts from {} (saved {})",
        store.len(),
        path.display(),
        header.saved_at.to_rfc3339()
    );
    Ok(store)
}

fn save_store(store: &MemoryStore<Concept>, path: &Path) -> anyhow::Result<()> {
    let header = save_snapshot(store, path)
        .with_context(|| format!("cannot save snapshot {}", path.display()))?;
    tracing::info!("Saved {} concepts to {}", header.entity_count, path.display());
    Ok(())
}

/// Count the concepts whose stored parentage differs from `reindexed`.
fn stale_count(store: &MemoryStore<Concept>, reindexed: &[Concept]) -> usize {
    reindexed
        .iter()
        .filter(|concept| store.get_one(&concept.id).as_ref() != Some(*concept))
        .count()
}

pub fn check(store_path: &Path, config: &ProcessorConfig) -> anyhow::Result<()> {
    let store = open_store(store_path)?;

    match reindex_all(&store, config) {
        Ok(reindexed) => {
            let stale = stale_count(&store, &reindexed);
            println!("{} concepts, 0 issues, {} with stale parentage", store.len(), stale);
            if stale > 0 {
                anyhow::bail!("{} concepts need a reindex", stale);
            }
            Ok(())
        }
        Err(ChangeError::InconsistentGraph { issues, dropped }) => {
            for issue in &issues {
                println!("{}", issue);
            }
            if dropped > 0 {
                println!("... and {} more", dropped);
            }
            anyhow::bail!("taxonomy has {} structural issues", issues.len() + dropped)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn reindex(store_path: &Path, config: &ProcessorConfig, dry_run: bool) -> anyhow::Result<()> {
    let store = open_store(store_path)?;
    let reindexed = reindex_all(&store, config)?;
    let stale = stale_count(&store, &reindexed);
    println!("{} of {} concepts updated", stale, reindexed.len());

    if dry_run || stale == 0 {
        return Ok(());
    }
    for concept in reindexed {
        store.insert(concept);
    }
    save_store(&store, store_path)
}

pub fn apply(store_path: &Path, changes: &Path, config: &ProcessorConfig, dry_run: bool) -> anyhow::Result<()> {
    let store = open_store(store_path)?;

    let source = std::fs::read_to_string(changes)
        .with_context(|| format!("cannot read change set {}", changes.display()))?;
    let change_set: ChangeSet<Concept> = serde_json::from_str(&source)
        .with_context(|| format!("invalid change set {}", changes.display()))?;

    let mut staging = StagingArea::from_change_set(&store, change_set)?;
    let report = TaxonomyChangeProcessor::new(*config).process(&store, &mut staging)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if dry_run {
        for concept in staging.staged() {
            println!("{}", serde_json::to_string(concept)?);
        }
        return Ok(());
    }
    let summary = staging.commit(&store);
    tracing::info!("Committed: {} removed, {} written", summary.removed, summary.written);
    save_store(&store, store_path)
}

pub fn show(store_path: &Path, id: &str) -> anyhow::Result<()> {
    let store = open_store(store_path)?;
    let concept = store
        .get_one(id)
        .with_context(|| format!("concept '{}' not found", id))?;
    println!("{}", serde_json::to_string_pretty(&concept)?);
    Ok(())
}
