//! Deciding whether a novelty makes an appointment unworkable.
//!
//! Absence windows are inclusive at both ends; a late arrival blocks only the
//! slots strictly before it. An appointment booked exactly at the arrival time
//! stands, while one booked exactly at the end of an absence does not.

use crate::{
  appointment::Appointment,
  novelty::{Disruption, Novelty},
};

/// Whether `novelty` affects `appointment`'s slot.
///
/// Only the time of day is considered; the caller scopes appointments to the
/// novelty's provider and date.
pub fn affects(appointment: &Appointment, novelty: &Novelty) -> bool {
  match novelty.disruption() {
    Some(Disruption::FullDay) => true,
    Some(Disruption::Partial { start, end }) => {
      start <= appointment.time && appointment.time <= end
    }
    Some(Disruption::Late { arrival }) => appointment.time < arrival,
    None => false,
  }
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, NaiveTime, Utc};
  use proptest::prelude::*;
  use uuid::Uuid;

  use super::*;
  use crate::novelty::{AbsenceKind, NoveltyState};

  fn t(h: u32, m: u32) -> NaiveTime { NaiveTime::from_hms_opt(h, m, 0).unwrap() }

  fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2030, 7, 1).unwrap() }

  fn novelty(
    state: NoveltyState,
    kind: Option<AbsenceKind>,
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
    entry: Option<NaiveTime>,
  ) -> Novelty {
    let now = Utc::now();
    Novelty {
      novelty_id: Uuid::new_v4(),
      provider_id: Uuid::new_v4(),
      date: date(),
      state,
      absence_kind: kind,
      absence_start: start,
      absence_end: end,
      entry_time: entry,
      exit_time: None,
      reason: None,
      void_reason: None,
      voided_at: None,
      created_at: now,
      updated_at: now,
    }
  }

  fn partial(start: NaiveTime, end: NaiveTime) -> Novelty {
    novelty(
      NoveltyState::Absent,
      Some(AbsenceKind::PartialHours),
      Some(start),
      Some(end),
      None,
    )
  }

  fn late(arrival: NaiveTime) -> Novelty {
    novelty(NoveltyState::Late, None, None, None, Some(arrival))
  }

  fn at(time: NaiveTime) -> Appointment {
    Appointment::pending(Uuid::new_v4(), date(), time)
  }

  #[test]
  fn full_day_affects_any_time() {
    let n = novelty(
      NoveltyState::Absent,
      Some(AbsenceKind::FullDay),
      Some(t(10, 0)),
      Some(t(20, 0)),
      None,
    );
    assert!(affects(&at(t(7, 30)), &n));
    assert!(affects(&at(t(21, 0)), &n));
  }

  #[test]
  fn partial_bounds_are_inclusive() {
    let n = partial(t(10, 0), t(12, 0));
    assert!(affects(&at(t(10, 0)), &n));
    assert!(affects(&at(t(12, 0)), &n));
    assert!(!affects(&at(t(12, 1)), &n));
    assert!(!affects(&at(t(9, 59)), &n));
  }

  #[test]
  fn late_bound_is_exclusive() {
    let n = late(t(11, 0));
    assert!(affects(&at(t(10, 30)), &n));
    assert!(!affects(&at(t(11, 0)), &n));
  }

  #[test]
  fn voided_affects_nothing() {
    let n = novelty(
      NoveltyState::Voided,
      Some(AbsenceKind::FullDay),
      Some(t(10, 0)),
      Some(t(20, 0)),
      None,
    );
    assert!(!affects(&at(t(12, 0)), &n));
  }

  fn arb_time() -> impl Strategy<Value = NaiveTime> {
    (7u32..22, 0u32..60).prop_map(|(h, m)| t(h, m))
  }

  proptest! {
    #[test]
    fn partial_matches_closed_interval(
      a in arb_time(),
      b in arb_time(),
      slot in arb_time(),
    ) {
      let (start, end) = if a <= b { (a, b) } else { (b, a) };
      let n = partial(start, end);
      prop_assert_eq!(affects(&at(slot), &n), start <= slot && slot <= end);
    }

    #[test]
    fn late_matches_half_open_interval(arrival in arb_time(), slot in arb_time()) {
      let n = late(arrival);
      prop_assert_eq!(affects(&at(slot), &n), slot < arrival);
    }
  }
}
