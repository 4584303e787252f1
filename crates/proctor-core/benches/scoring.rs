use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use proctor_core::ledger::AnswerLedger;
use proctor_core::model::Question;
use proctor_core::scoring::score;

fn make_questions(n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| Question {
            name: format!("Question {i}"),
            options: ["A", "B", "C", "D"]
                .iter()
                .map(|k| (k.to_string(), format!("Option {k} for {i}")))
                .collect::<BTreeMap<_, _>>(),
            correct_option: ["A", "B", "C", "D"][i % 4].to_string(),
        })
        .collect()
}

fn make_ledger(n: usize, answered_every: usize) -> AnswerLedger {
    let mut ledger = AnswerLedger::new(n);
    for i in (0..n).step_by(answered_every) {
        ledger.select(i, ["A", "B", "C", "D"][(i / 3) % 4]).unwrap();
    }
    ledger
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    for n in [10usize, 100, 1_000] {
        let questions = make_questions(n);
        let full = make_ledger(n, 1);
        let sparse = make_ledger(n, 5);

        group.bench_function(format!("n={n},all answered"), |b| {
            b.iter(|| score(black_box(&questions), black_box(&full), black_box(n as u32 / 2)))
        });

        group.bench_function(format!("n={n},sparse"), |b| {
            b.iter(|| score(black_box(&questions), black_box(&sparse), black_box(n as u32 / 2)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_score);
criterion_main!(benches);
