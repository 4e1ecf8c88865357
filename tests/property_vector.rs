use proptest::prelude::*;
use tinyclj::vector::Vector;

#[derive(Clone, Debug)]
enum Op {
    Conj(u32),
    Assoc(usize, u32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<u32>().prop_map(Op::Conj),
        1 => (any::<usize>(), any::<u32>()).prop_map(|(i, v)| Op::Assoc(i, v)),
    ]
}

fn check(vector: &Vector<u32>, model: &[u32]) -> Result<(), TestCaseError> {
    prop_assert_eq!(vector.len(), model.len());
    for (i, expected) in model.iter().enumerate() {
        prop_assert_eq!(vector.nth(i).ok(), Some(expected));
    }
    prop_assert!(vector.nth(model.len()).is_err());
    let collected: Vec<u32> = vector.iter().copied().collect();
    prop_assert_eq!(collected.as_slice(), model);
    Ok(())
}

#[test]
fn conj_across_growth_boundaries() {
    for n in [0usize, 1, 31, 32, 33, 1024, 1056, 1057, 40000] {
        let vector: Vector<usize> = (0..n).collect();
        assert_eq!(vector.len(), n);
        for i in 0..n {
            assert_eq!(*vector.nth(i).unwrap(), i, "n = {}", n);
        }
        assert!(vector.nth(n).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn matches_vec_model(
        prefix in 0usize..1100,
        ops in prop::collection::vec(op_strategy(), 0..120),
    ) {
        let mut model: Vec<u32> = (0..prefix as u32).collect();
        let mut vector: Vector<u32> = model.iter().copied().collect();
        let mut history = vec![(vector.clone(), model.clone())];

        for op in ops {
            match op {
                Op::Conj(v) => {
                    vector = vector.conj(v);
                    model.push(v);
                }
                Op::Assoc(i, v) => {
                    let i = i % (model.len() + 2);
                    match vector.assoc(i, v) {
                        Ok(next) => {
                            prop_assert!(i <= model.len());
                            if i == model.len() {
                                model.push(v);
                            } else {
                                model[i] = v;
                            }
                            vector = next;
                        }
                        Err(err) => {
                            prop_assert!(i > model.len());
                            prop_assert_eq!(err.index, i);
                            prop_assert_eq!(err.count, model.len());
                        }
                    }
                }
            }
            history.push((vector.clone(), model.clone()));
        }

        for (old, expected) in &history {
            check(old, expected)?;
        }
    }
}
