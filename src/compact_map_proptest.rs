#![cfg(test)]

// Property tests for CompactHashMap kept inside the crate so they can reach
// the test-only constructors and structure checks.

use crate::compact_map::CompactHashMap;
use crate::error::CompactError;
use crate::translator::MapTranslator;
use crate::translator::Utf8I32Translator;
use proptest::prelude::*;
use siphasher::sip::SipHasher;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::string::String;
use std::vec::Vec;

#[derive(Clone, Default)]
struct FixedSip;

impl BuildHasher for FixedSip {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new_with_keys(0x5eed, 0xc0ffee)
    }
}

/// Maps keys to a handful of hashes so that probe chains overlap heavily.
#[derive(Clone, Default)]
struct CrowdedTranslator {
    inner: Utf8I32Translator<FixedSip>,
}

impl MapTranslator for CrowdedTranslator {
    type Key = String;
    type Value = i32;

    fn hash(&self, key: &String) -> u64 {
        self.inner.hash(key) % 5
    }

    fn serialize(&self, key: &String, value: &i32) -> Vec<u8> {
        self.inner.serialize(key, value)
    }

    fn deserialize_key(&self, packed: &[u8]) -> String {
        self.inner.deserialize_key(packed)
    }

    fn deserialize_value(&self, packed: &[u8]) -> i32 {
        self.inner.deserialize_value(packed)
    }

    fn key_matches(&self, key: &String, packed: &[u8]) -> bool {
        self.inner.key_matches(key, packed)
    }
}

// Pool-indexed operations so that shrinking converges on earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    CursorRemoveOdd,
    CursorBump(i32),
    RetainEven,
    ShrinkToFit,
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,6}", 1..=40).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            4 => idx.clone().prop_map(Op::Remove),
            3 => idx.prop_map(Op::Get),
            1 => Just(Op::CursorRemoveOdd),
            1 => any::<i32>().prop_map(Op::CursorBump),
            1 => Just(Op::RetainEven),
            1 => Just(Op::ShrinkToFit),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_scenario<T>(
    mut sut: CompactHashMap<T>,
    pool: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError>
where
    T: MapTranslator<Key = String, Value = i32>,
{
    let mut model: HashMap<String, i32> = HashMap::new();
    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let key = pool[i].clone();
                prop_assert_eq!(sut.insert(key.clone(), v), model.insert(key, v));
            }
            Op::Remove(i) => {
                prop_assert_eq!(sut.remove(&pool[i]), model.remove(&pool[i]));
            }
            Op::Get(i) => {
                prop_assert_eq!(sut.get(&pool[i]), model.get(&pool[i]).copied());
                prop_assert_eq!(sut.contains_key(&pool[i]), model.contains_key(&pool[i]));
            }
            Op::CursorRemoveOdd => {
                let mut cursor = sut.cursor();
                let mut visited = 0;
                while let Some((key, value)) = cursor.next(&sut).map_err(fail)? {
                    visited += 1;
                    prop_assert_eq!(model.get(&key), Some(&value));
                    if value % 2 != 0 {
                        cursor.remove(&mut sut).map_err(fail)?;
                        model.remove(&key);
                    }
                }
                prop_assert!(visited >= model.len());
            }
            Op::CursorBump(delta) => {
                let mut cursor = sut.cursor();
                while cursor.has_next(&sut).map_err(fail)? {
                    let Some((key, value)) = cursor.next(&sut).map_err(fail)? else {
                        break;
                    };
                    let bumped = value.wrapping_add(delta);
                    prop_assert_eq!(cursor.replace_value(&mut sut, bumped), Ok(value));
                    model.insert(key, bumped);
                }
            }
            Op::RetainEven => {
                sut.retain(|_, value| value % 2 == 0);
                model.retain(|_, value| *value % 2 == 0);
            }
            Op::ShrinkToFit => sut.shrink_to_fit(),
            Op::Clear => {
                sut.clear();
                model.clear();
            }
        }
        prop_assert_eq!(sut.len(), model.len());
        sut.check_structure();
    }

    let mut seen = 0;
    for (key, value) in &sut {
        prop_assert_eq!(model.get(&key), Some(&value));
        seen += 1;
    }
    prop_assert_eq!(seen, model.len());
    Ok(())
}

fn fail(err: CompactError) -> TestCaseError {
    TestCaseError::fail(std::format!("cursor failed: {err}"))
}

// State-machine equivalence against std::collections::HashMap, checking
// every structural invariant of the table after each operation.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_matches_std_map((pool, ops) in arb_scenario()) {
        let sut = CompactHashMap::new(Utf8I32Translator::with_hasher(FixedSip));
        run_scenario(sut, &pool, ops)?;
    }

    #[test]
    fn prop_matches_std_map_with_crowded_hashes((pool, ops) in arb_scenario()) {
        let sut = CompactHashMap::new(CrowdedTranslator::default());
        run_scenario(sut, &pool, ops)?;
    }

    #[test]
    fn prop_small_ceiling_reports_exhaustion((pool, ops) in arb_scenario()) {
        let mut sut = CompactHashMap::with_max_len(CrowdedTranslator::default(), 16);
        let mut model: HashMap<String, i32> = HashMap::new();
        for op in ops {
            match op {
                Op::Insert(i, v) => {
                    let key = pool[i].clone();
                    match sut.try_insert(key.clone(), v) {
                        Ok(previous) => {
                            prop_assert_eq!(previous, model.insert(key, v));
                        }
                        Err(err) => {
                            prop_assert_eq!(err, CompactError::CapacityExhausted);
                            prop_assert!(!model.contains_key(&key));
                            prop_assert_eq!(model.len(), 15);
                        }
                    }
                }
                Op::Remove(i) | Op::Get(i) => {
                    prop_assert_eq!(sut.remove(&pool[i]), model.remove(&pool[i]));
                }
                _ => {}
            }
            prop_assert!(sut.len() <= 15);
            prop_assert_eq!(sut.len(), model.len());
            sut.check_structure();
        }
    }
}
