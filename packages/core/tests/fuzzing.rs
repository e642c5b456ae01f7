//! Randomised stress for the keyed differ: any permutation-with-churn of a
//! keyed list must converge to the expected document.

use casement_core::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

static FUZZ_LIST: ComponentDef = ComponentDef::new("FuzzList", |scope| {
    let order = scope.state().get("order");
    let keys: Vec<String> = match order {
        StateValue::Text(s) => s.split(',').filter(|k| !k.is_empty()).map(String::from).collect(),
        _ => Vec::new(),
    };
    Ok(Some(
        el("ol")
            .children(
                keys.iter()
                    .map(|k| el("li").key(k).child(text(k)).build()),
            )
            .build(),
    ))
})
.with_setup(|scope| {
    scope.state().declare("order", "");
});

fn expected_html(keys: &[u32]) -> String {
    let mut out = String::from("<ol>");
    for k in keys {
        out.push_str(&format!("<li>{}</li>", k));
    }
    out.push_str("</ol>");
    out
}

#[test]
fn random_keyed_churn_converges() {
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    let mut dom = VirtualDom::new(&FUZZ_LIST);
    dom.rebuild().unwrap();
    let real = dom.dom();

    let mut pool: Vec<u32> = (0..12).collect();

    // Stay under the per-scope commit throttle's rolling window.
    for _ in 0..40 {
        // Shuffle, drop a few, occasionally introduce a new key.
        for i in (1..pool.len()).rev() {
            let j = rng.gen_range(0..=i);
            pool.swap(i, j);
        }
        let keep = rng.gen_range(1..=pool.len());
        let mut keys: Vec<u32> = pool[..keep].to_vec();
        if rng.gen_bool(0.3) {
            keys.push(rng.gen_range(100..200));
        }
        keys.dedup();

        let order = keys
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(",");
        dom.base_scope().unwrap().set_state([("order", order)]);
        dom.flush_frame();

        assert_eq!(real.inner_html(&real.root()), expected_html(&keys));
    }
}
