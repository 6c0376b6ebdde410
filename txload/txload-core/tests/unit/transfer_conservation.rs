use crate::fixtures::{utxo, wallet};
use txload_core::domain::{build_transfer, ChangePlacement, Payment};
use txload_core::foundation::Defect;

#[test]
fn test_transfer_when_amounts_vary_then_outputs_always_sum_to_inputs() {
    let change_to = wallet(0).change_address();
    for (inputs, paid) in [(vec![10u64], 10u64), (vec![10], 3), (vec![4, 4, 4], 9), (vec![1], 0), (vec![u64::MAX], 1)] {
        let spent = inputs.iter().zip(0u32..).map(|(amount, position)| utxo("src", position, *amount)).collect::<Vec<_>>();
        let payments = if paid == 0 { Vec::new() } else { vec![Payment::new(wallet(1), paid)] };
        let tx = build_transfer(&spent, &payments, &change_to, ChangePlacement::Trailing).expect("transfer");
        let input_total: u128 = inputs.iter().map(|amount| u128::from(*amount)).sum();
        let output_total: u128 = tx.outputs().iter().map(|out| u128::from(out.amount)).sum();
        assert_eq!(input_total, output_total);
        let has_change = input_total > u128::from(paid);
        assert_eq!(tx.outputs().len(), payments.len() + usize::from(has_change));
    }
}

#[test]
fn test_transfer_when_inputs_overflow_then_defect() {
    let spent = vec![utxo("src", 0, u64::MAX), utxo("src", 1, 1)];
    let err = build_transfer(&spent, &[Payment::new(wallet(1), 1)], &wallet(0), ChangePlacement::Trailing).unwrap_err();
    assert_eq!(err, Defect::AmountOverflow { side: "inputs" });
}

#[test]
fn test_transfer_when_leading_change_then_units_follow_it() {
    let own = wallet(3);
    let payments = vec![Payment::new(own.clone(), 1); 4];
    let tx = build_transfer(&[utxo("root", 0, 10)], &payments, &own.change_address(), ChangePlacement::Leading).expect("transfer");
    assert_eq!(tx.outputs()[0].amount, 6);
    assert_eq!(tx.outputs()[0].address_base, own.key_identifier);
    assert!(tx.outputs()[1..].iter().all(|out| out.amount == 1 && out.address_base == own.base));
}
