//! Property-based tests relating `Stream` combinators to their `Vec`
//! counterparts.

use effstream::stream::Stream;
use proptest::prelude::*;

fn collect(stream: &Stream<i32>) -> Vec<i32> {
    stream.to_vec().run().unwrap()
}

proptest! {
    #[test]
    fn prop_of_then_to_vec_is_identity(values: Vec<i32>) {
        prop_assert_eq!(collect(&Stream::of(values.clone())), values);
    }

    #[test]
    fn prop_take_matches_vec(values: Vec<i32>, count in 0_usize..40) {
        let expected: Vec<i32> = values.iter().copied().take(count).collect();
        prop_assert_eq!(collect(&Stream::of(values).take(count)), expected);
    }

    #[test]
    fn prop_drop_matches_vec(values: Vec<i32>, count in 0_usize..40) {
        let expected: Vec<i32> = values.iter().copied().skip(count).collect();
        prop_assert_eq!(collect(&Stream::of(values).drop(count)), expected);
    }

    #[test]
    fn prop_take_append_drop_is_identity(values: Vec<i32>, count in 0_usize..40) {
        let stream = Stream::of(values.clone());
        let rejoined = stream.take(count).append(stream.drop(count));
        prop_assert_eq!(collect(&rejoined), values);
    }

    #[test]
    fn prop_reverse_matches_vec(values in prop::collection::vec(any::<i32>(), 0..64)) {
        let mut expected = values.clone();
        expected.reverse();
        prop_assert_eq!(collect(&Stream::of(values).reverse()), expected);
    }

    #[test]
    fn prop_filter_matches_vec(values: Vec<i32>) {
        let expected: Vec<i32> = values.iter().copied().filter(|x| x % 3 == 0).collect();
        prop_assert_eq!(collect(&Stream::of(values).filter(|x| x % 3 == 0)), expected);
    }

    #[test]
    fn prop_take_while_matches_vec(values: Vec<i32>, limit: i32) {
        let expected: Vec<i32> = values.iter().copied().take_while(|x| *x < limit).collect();
        prop_assert_eq!(collect(&Stream::of(values).take_while(move |x| *x < limit, false)), expected);
    }

    #[test]
    fn prop_drop_while_matches_vec(values: Vec<i32>, limit: i32) {
        let expected: Vec<i32> = values.iter().copied().skip_while(|x| *x < limit).collect();
        prop_assert_eq!(collect(&Stream::of(values).drop_while(move |x| *x < limit)), expected);
    }

    #[test]
    fn prop_fold_left_matches_vec(values: Vec<i32>) {
        let expected = values
            .iter()
            .fold(0_i64, |acc, x| acc.wrapping_mul(31).wrapping_add(i64::from(*x)));
        let folded = Stream::of(values)
            .fold_left(0_i64, |acc, x| acc.wrapping_mul(31).wrapping_add(i64::from(x)))
            .run()
            .unwrap();
        prop_assert_eq!(folded, expected);
    }

    #[test]
    fn prop_flat_map_matches_vec(values in prop::collection::vec(-100_i32..100, 0..32)) {
        let expected: Vec<i32> = values.iter().flat_map(|x| [*x, -*x]).collect();
        let stream = Stream::of(values).flat_map(|x| Stream::of([x, -x]));
        prop_assert_eq!(collect(&stream), expected);
    }
}
