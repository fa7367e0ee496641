use proptest::prelude::*;
use std::sync::Arc;
use trav_traverser::{
    Coefficient, CountingTraverser, Labels, LongCoefficient, RequirementSet, Traverse, Traverser,
    TraverserGenerator, TraverserRequirement, Via,
};

#[test]
fn test_split_chain_grows_path_one_hop_each() {
    let generator: TraverserGenerator =
        TraverserGenerator::new(Arc::new(std::iter::once(TraverserRequirement::Path).collect()), None);
    let mut t = generator.generate_one(0_i64, &Labels::new());

    for i in 1..=5 {
        let before = t.path().map_or(0, trav_traverser::Path::len);
        t = t.split(i, &Via::new(&Labels::new(), LongCoefficient::one()));
        assert_eq!(t.path().map_or(0, trav_traverser::Path::len), before + 1);
    }

    let objects: Vec<i64> = t.path().unwrap().objects().copied().collect();
    assert_eq!(objects, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_mixed_merge_adds_counts() {
    let mut counting: Traverser<&str> = Traverser::Counting(CountingTraverser::new("x").with_bulk(2));
    let weighted: Traverser<&str> = Traverser::weighted("x", LongCoefficient(3));
    counting.merge(&weighted);
    assert_eq!(counting.multiplicity(), 5);
}

proptest! {
    #[test]
    fn prop_coefficient_split_is_product(a in 0u64..10_000, b in 0u64..10_000) {
        let t: Traverser<u8> = Traverser::weighted(0, LongCoefficient(a));
        let split = t.split(1, &Via::new(&Labels::new(), LongCoefficient(b)));
        prop_assert_eq!(split.weight(), LongCoefficient(a * b));
        prop_assert_eq!(t.weight(), LongCoefficient(a));
    }

    #[test]
    fn prop_counting_split_conserves_bulk(bulk in 1u64..1_000, weight in 0u64..1_000) {
        let t: Traverser<u8> = Traverser::Counting(CountingTraverser::new(0).with_bulk(bulk));
        let split = t.split(1, &Via::new(&Labels::new(), LongCoefficient(weight)));
        prop_assert_eq!(split.multiplicity(), bulk);
    }

    #[test]
    fn prop_merge_sums(bulks in proptest::collection::vec(0u64..1_000, 1..20)) {
        let mut acc: Traverser<u8> = Traverser::Counting(CountingTraverser::new(7).with_bulk(0));
        for bulk in &bulks {
            acc.merge(&Traverser::Counting(CountingTraverser::new(7).with_bulk(*bulk)));
        }
        prop_assert_eq!(acc.multiplicity(), bulks.iter().sum::<u64>());
    }

    #[test]
    fn prop_generator_one_bulk(initial in 0u64..1_000) {
        let requirements: RequirementSet = std::iter::once(TraverserRequirement::OneBulk).collect();
        let generator: TraverserGenerator = TraverserGenerator::new(Arc::new(requirements), None);
        let t = generator.generate(1u8, &Labels::new(), LongCoefficient(initial));
        prop_assert_eq!(t.multiplicity(), 1);
    }
}
