use crate::domain::model::UnspentOutput;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputSelection {
    pub selected: Vec<UnspentOutput>,
    pub total: u64,
}

impl OutputSelection {
    pub fn covers(&self, target: u64) -> bool {
        self.total >= target
    }
}

/// Largest outputs first, accumulated until `target` is covered.
///
/// A zero target selects nothing. When the whole set falls short, every output is returned and
/// `covers(target)` reports false.
pub fn select_outputs(mut outputs: Vec<UnspentOutput>, target: u64) -> OutputSelection {
    let mut selection = OutputSelection::default();
    if target == 0 {
        return selection;
    }
    sort_by_amount_desc(&mut outputs);
    for output in outputs {
        selection.total = selection.total.saturating_add(output.amount);
        selection.selected.push(output);
        if selection.total >= target {
            break;
        }
    }
    selection
}

pub fn largest_output(mut outputs: Vec<UnspentOutput>) -> Option<UnspentOutput> {
    sort_by_amount_desc(&mut outputs);
    outputs.into_iter().next()
}

fn sort_by_amount_desc(outputs: &mut [UnspentOutput]) {
    outputs.sort_by(|a, b| b.amount.cmp(&a.amount));
}
