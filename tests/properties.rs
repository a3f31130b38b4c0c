//! Laws that hold for arbitrary inputs.

use proptest::prelude::*;
use rxflow::{
  prelude::*,
  testing::{TestObserver, TestSubscriber},
};

fn collect<S>(source: S) -> Vec<i64>
where
  S: Observable<Item = i64, Err = Infallible>,
{
  let observer = TestObserver::new();
  source.subscribe_with(observer.clone());
  observer.values()
}

proptest! {
  #[test]
  fn map_composes(values in prop::collection::vec(any::<i64>(), 0..64), a in any::<i64>(), b in any::<i64>()) {
    let f = move |v: i64| v.wrapping_mul(a);
    let g = move |v: i64| v.wrapping_add(b);

    let chained = collect(observable::from_iter(values.clone()).map(f).map(g));
    let fused = collect(observable::from_iter(values.clone()).map(move |v| g(f(v))));
    prop_assert_eq!(&chained, &fused);
    prop_assert_eq!(chained, values.into_iter().map(move |v| g(f(v))).collect::<Vec<_>>());
  }

  #[test]
  fn range_delivers_exactly_the_requested_prefix(
    count in 0u64..200,
    requests in prop::collection::vec(1u64..40, 0..12),
  ) {
    let subscriber = TestSubscriber::<u64, Infallible>::new();
    flowable::range(0, count).subscribe_with(subscriber.clone());

    let mut total = 0u64;
    for n in requests {
      let before = subscriber.values().len() as u64;
      subscriber.request(n);
      total += n;
      let values = subscriber.values();
      prop_assert!(values.len() as u64 >= before);
      prop_assert_eq!(values.len() as u64, total.min(count));
      prop_assert_eq!(values, (0..total.min(count)).collect::<Vec<_>>());
    }
    prop_assert_eq!(subscriber.is_completed(), total >= count);
  }

  #[test]
  fn operators_never_exceed_demand(
    count in 0u64..300,
    divisor in 1u64..5,
    requests in prop::collection::vec(1u64..25, 0..12),
  ) {
    let subscriber = TestSubscriber::<u64, Infallible>::new();
    flowable::range(0, count)
      .filter(move |v| v % divisor == 0)
      .map(|v| v * 2)
      .flat_map_iter(|v| vec![v, v + 1])
      .take(150)
      .subscribe_with(subscriber.clone());

    let mut total = 0u64;
    for n in requests {
      subscriber.request(n);
      total += n;
      prop_assert!(subscriber.values().len() as u64 <= total);
      prop_assert_eq!(subscriber.outstanding(), total - subscriber.values().len() as u64);
    }
    let expected: Vec<u64> = (0..count)
      .filter(|v| v % divisor == 0)
      .flat_map(|v| vec![v * 2, v * 2 + 1])
      .take(150)
      .take(total as usize)
      .collect();
    prop_assert_eq!(subscriber.values(), expected);
  }

  #[test]
  fn buffered_boundary_respects_demand(
    values in prop::collection::vec(any::<i32>(), 0..50),
    requests in prop::collection::vec(1u64..10, 0..10),
  ) {
    let subscriber = TestSubscriber::<Vec<i32>, BackpressureError>::new();
    observable::from_iter(values.clone())
      .to_flowable(OverflowPolicy::buffer(64))
      .buffer_count(3)
      .subscribe_with(subscriber.clone());

    let mut total = 0u64;
    for n in requests {
      subscriber.request(n);
      total += n;
      prop_assert!(subscriber.values().len() as u64 <= total);
    }
    let chunks: Vec<Vec<i32>> = values.chunks(3).map(<[i32]>::to_vec).collect();
    let delivered = (total as usize).min(chunks.len());
    prop_assert_eq!(subscriber.values(), chunks[..delivered].to_vec());
  }
}
