use std::collections::BTreeMap;

use codart_refactor::{RewriteBuffer, RewriteError};
use codart_syntax::lex;
use proptest::prelude::*;

const PROPTEST_CASES: u32 = 256;

fn arb_source() -> impl Strategy<Value = String> {
    let word = prop::sample::select(vec![
        "int", "a", "b", "=", "+", ";", "foo", "(", ")", "{", "}", "this", ".", "\"s\"", "42",
        "// c\n", "\n",
    ]);
    prop::collection::vec(word, 1..24).prop_map(|words| words.join(" "))
}

fn arb_text() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["", "x", "$$t", " ", "\n", "new T()"]).prop_map(str::to_string)
}

#[derive(Clone, Debug)]
struct PlanStep {
    insert: Option<String>,
    replace_len: usize,
    replace_text: String,
}

fn arb_plan_step() -> impl Strategy<Value = PlanStep> {
    (prop::option::of(arb_text()), 0usize..=3, arb_text()).prop_map(
        |(insert, replace_len, replace_text)| PlanStep {
            insert,
            replace_len,
            replace_text,
        },
    )
}

#[derive(Clone, Debug)]
enum Edit {
    InsertBefore(usize, String),
    Replace(usize, usize, String),
}

/// Inserts at token boundaries and replacements over disjoint token ranges.
fn edits_from_plan(len: usize, plan: &[PlanStep]) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut i = 0usize;
    while i < len {
        let step = &plan[i];
        if let Some(text) = &step.insert {
            edits.push(Edit::InsertBefore(i, text.clone()));
        }
        if step.replace_len > 0 {
            let end = (i + step.replace_len - 1).min(len - 1);
            edits.push(Edit::Replace(i, end, step.replace_text.clone()));
            i = end + 1;
        } else {
            i += 1;
        }
    }
    edits
}

fn shuffle_with_seed<T>(items: &mut [T], mut seed: u64) {
    for i in (1..items.len()).rev() {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        let j = (seed % (i as u64 + 1)) as usize;
        items.swap(i, j);
    }
}

fn render_reference(token_texts: &[&str], edits: &[Edit]) -> String {
    let mut inserts: BTreeMap<usize, &str> = BTreeMap::new();
    let mut ranges: BTreeMap<usize, (usize, &str)> = BTreeMap::new();
    for edit in edits {
        match edit {
            Edit::InsertBefore(i, text) => {
                inserts.insert(*i, text.as_str());
            }
            Edit::Replace(start, end, text) => {
                ranges.insert(*start, (*end, text.as_str()));
            }
        }
    }

    let mut out = String::new();
    let mut i = 0usize;
    while i < token_texts.len() {
        if let Some(text) = inserts.get(&i) {
            out.push_str(text);
        }
        match ranges.get(&i) {
            Some((end, text)) => {
                out.push_str(text);
                i = end + 1;
            }
            None => {
                out.push_str(token_texts[i]);
                i += 1;
            }
        }
    }
    out
}

fn arb_source_and_edits() -> impl Strategy<Value = (String, Vec<Edit>)> {
    (arb_source(), any::<u64>()).prop_flat_map(|(source, seed)| {
        let len = lex(&source).len();
        let plan = prop::collection::vec(arb_plan_step(), len..=len);
        (Just(source), plan).prop_map(move |(source, plan)| {
            let mut edits = edits_from_plan(len, &plan);
            shuffle_with_seed(&mut edits, seed);
            (source, edits)
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: PROPTEST_CASES,
        .. ProptestConfig::default()
    })]

    #[test]
    fn untouched_buffer_is_identity(source in arb_source()) {
        let tokens = lex(&source);
        let buffer = RewriteBuffer::new(&source, &tokens);
        prop_assert!(!buffer.is_modified());
        prop_assert_eq!(buffer.render(), source);
    }

    #[test]
    fn disjoint_edits_apply_in_any_order((source, edits) in arb_source_and_edits()) {
        let tokens = lex(&source);
        let mut buffer = RewriteBuffer::new(&source, &tokens);
        for edit in &edits {
            let result = match edit {
                Edit::InsertBefore(i, text) => buffer.insert_before(*i, text.clone()),
                Edit::Replace(start, end, text) => buffer.replace(*start, *end, text.clone()),
            };
            prop_assert!(result.is_ok(), "{edit:?} rejected: {result:?}");
        }
        prop_assert_eq!(buffer.is_modified(), !edits.is_empty());

        let texts: Vec<&str> = tokens.iter().map(|t| t.text(&source)).collect();
        prop_assert_eq!(buffer.render(), render_reference(&texts, &edits));
    }

    #[test]
    fn overlapping_ranges_fail_fast(
        source in arb_source(),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
        c in any::<prop::sample::Index>(),
        extra in 0usize..3,
    ) {
        let tokens = lex(&source);
        let len = tokens.len();
        let mut first = [a.index(len), b.index(len)];
        first.sort_unstable();
        let [start, end] = first;
        let inside = start + c.index(end - start + 1);
        let second_end = (inside + extra).min(len - 1);

        let mut buffer = RewriteBuffer::new(&source, &tokens);
        buffer.delete(start, end).unwrap();
        let before = buffer.render();
        prop_assert_eq!(
            buffer.replace(inside, second_end, "x"),
            Err(RewriteError::OverlappingEdits {
                first: (start, end),
                second: (inside, second_end),
            })
        );
        prop_assert_eq!(buffer.ops().len(), 1);
        prop_assert_eq!(buffer.render(), before);
    }
}
