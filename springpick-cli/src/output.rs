/// Output formatting: terminal table and JSON.
use serde::Serialize;
use springpick_core::{NextPair, Ranking};

#[derive(Serialize)]
struct JsonTier {
    rank: usize,
    score: f64,
    items: Vec<i64>,
}

#[derive(Serialize)]
struct JsonOutput {
    tiers: Vec<JsonTier>,
    total_comparisons: usize,
    approximate: bool,
    next: Option<(i64, i64)>,
}

/// Print a ranking as a formatted terminal table.
pub fn print_table(ranking: &Ranking, total_comparisons: usize) {
    println!(" # |    Score | Items");
    println!("---|----------|------");

    for (i, tier) in ranking.tiers().iter().enumerate() {
        let members: Vec<String> = tier.items.iter().map(|id| id.to_string()).collect();
        println!("{:>2} | {:>8.4} | {}", i + 1, tier.score, members.join(", "));
    }

    println!(
        "\n{} items in {} tiers ({} comparisons)",
        ranking.len(),
        ranking.tiers().len(),
        total_comparisons,
    );
    if ranking.is_approximate() {
        println!("Scores are approximate: the iterative solver did not converge");
    }
}

pub fn print_next(next: NextPair) {
    match next {
        NextPair::Pair(a, b) => println!("Next: {a} vs {b}"),
        NextPair::Exhausted => println!("Next: exhausted (every pair has been compared)"),
    }
}

/// Print a ranking, and optionally the next pair, as JSON.
pub fn print_json(ranking: Option<&Ranking>, total_comparisons: usize, next: Option<NextPair>) {
    let tiers = ranking
        .map(|r| {
            r.tiers()
                .iter()
                .enumerate()
                .map(|(i, tier)| JsonTier {
                    rank: i + 1,
                    score: tier.score,
                    items: tier.items.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    let output = JsonOutput {
        tiers,
        total_comparisons,
        approximate: ranking.is_some_and(Ranking::is_approximate),
        next: next.and_then(|n| n.pair()),
    };

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{json}"),
        Err(e) => crate::bail(format!("Failed to serialize output: {e}")),
    }
}
