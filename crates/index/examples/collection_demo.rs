use serde_json::json;
use index::{CollectionLayout, DocumentKind, SearchOptions, StoreRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let root = std::env::temp_dir().join("kb-collection-demo");
    std::fs::create_dir_all(&root)?;

    // Two insights and one curriculum activity, embedded in a toy 4-dim space.
    let insights = json!([
        {
            "id": "ins-1",
            "text": "Pair each trainee with a mentor for the first month.",
            "embedding": [0.9, 0.1, 0.0, 0.0],
            "metadata": { "expert": "R. Okafor", "topic": "mentoring" }
        },
        {
            "id": "ins-2",
            "text": "Budget for replacement harnesses every season.",
            "embedding": [0.0, 0.2, 0.9, 0.1],
            "metadata": { "expert": "J. Lind", "topic": "budget" }
        }
    ]);
    let curriculum = json!([
        {
            "id": "cur-1",
            "text": "Shadowing session with a senior installer.",
            "embedding": [0.7, 0.6, 0.0, 0.0],
            "metadata": { "module": "1", "day": 2, "activity_name": "Shadowing" }
        }
    ]);
    std::fs::write(root.join("insights_embedded_4.json"), insights.to_string())?;
    std::fs::write(root.join("curriculum_embedded_4.json"), curriculum.to_string())?;

    let layout = CollectionLayout::new(&root).with_spec(4, "_4");
    let registry = StoreRegistry::new(layout);
    println!("Dimensions on disk: {:?}", registry.available_dimensions());

    let store = registry.get_or_load(4).await?;
    println!("Loaded {} documents.", store.count());

    let query = [0.8, 0.3, 0.0, 0.0];
    let all = store.search(&query, &SearchOptions::default())?;
    let only_curriculum = store.search(
        &query,
        &SearchOptions::default().with_kind(Some(DocumentKind::Curriculum)),
    )?;

    for hit in &all {
        println!("{:.3} {} {}", hit.similarity, hit.document.kind, hit.document.id);
    }
    println!("Curriculum only: {} hit(s)", only_curriculum.len());

    Ok(())
}
