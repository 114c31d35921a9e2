//! The appointment cascade that follows every novelty mutation.
//!
//! State transitions this engine may perform:
//!
//! ```text
//! Pending | Confirmed | InProgress --(affected by new/updated novelty)--> CancelledByNovelty
//! CancelledByNovelty              --(that novelty voided)--------------> Pending
//! ```
//!
//! The engine runs against an [`AppointmentRepository`] that the storage
//! backend implements over its open transaction, so the novelty write and the
//! whole cascade commit or roll back together. Notices are returned rather
//! than sent; the caller dispatches them after commit.
//!
//! Updating a novelty never reactivates appointments it no longer affects.
//! Only voiding does.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  appointment::{Appointment, AppointmentState},
  notify::Notice,
  novelty::Novelty,
  overlap::affects,
};

/// The appointment operations the cascade needs.
pub trait AppointmentRepository {
  type Error;

  /// Appointments for `provider_id` on `date` in a reconcilable state.
  fn find_active_by_provider_and_date(
    &mut self,
    provider_id: Uuid,
    date: NaiveDate,
  ) -> Result<Vec<Appointment>, Self::Error>;

  /// Appointments whose novelty back-reference is `novelty_id` and whose
  /// state is `state`.
  fn find_by_novelty_and_state(
    &mut self,
    novelty_id: Uuid,
    state: AppointmentState,
  ) -> Result<Vec<Appointment>, Self::Error>;

  fn save(&mut self, appointment: &Appointment) -> Result<(), Self::Error>;
}

/// The cancellation reason written onto an affected appointment.
pub fn cancellation_reason(novelty: &Novelty) -> String {
  format!("Provider novelty: {}", novelty.state.label())
}

/// Cancel every reconcilable appointment the (new or updated) novelty
/// affects. Returns one [`Notice::Cancellation`] per cancelled appointment.
pub fn on_novelty_committed<R: AppointmentRepository>(
  repo: &mut R,
  novelty: &Novelty,
) -> Result<Vec<Notice>, R::Error> {
  let candidates =
    repo.find_active_by_provider_and_date(novelty.provider_id, novelty.date)?;

  let mut notices = Vec::new();
  for mut appointment in candidates {
    if !appointment.state.is_reconcilable() || !affects(&appointment, novelty) {
      continue;
    }

    appointment.state = AppointmentState::CancelledByNovelty;
    appointment.cancellation_reason = Some(cancellation_reason(novelty));
    appointment.novelty_id = Some(novelty.novelty_id);
    repo.save(&appointment)?;

    tracing::debug!(
      appointment_id = %appointment.appointment_id,
      novelty_id = %novelty.novelty_id,
      "appointment cancelled by novelty"
    );
    notices.push(Notice::Cancellation {
      appointment,
      novelty: novelty.clone(),
    });
  }

  Ok(notices)
}

/// Return every appointment cancelled by `novelty` to `Pending`. Returns one
/// [`Notice::Reactivation`] per reactivated appointment.
pub fn on_novelty_voided<R: AppointmentRepository>(
  repo: &mut R,
  novelty: &Novelty,
) -> Result<Vec<Notice>, R::Error> {
  let cancelled = repo
    .find_by_novelty_and_state(novelty.novelty_id, AppointmentState::CancelledByNovelty)?;

  let mut notices = Vec::with_capacity(cancelled.len());
  for mut appointment in cancelled {
    appointment.state = AppointmentState::Pending;
    appointment.cancellation_reason = None;
    appointment.novelty_id = None;
    repo.save(&appointment)?;

    tracing::debug!(
      appointment_id = %appointment.appointment_id,
      novelty_id = %novelty.novelty_id,
      "appointment reactivated after void"
    );
    notices.push(Notice::Reactivation { appointment });
  }

  Ok(notices)
}

#[cfg(test)]
mod tests {
  use std::convert::Infallible;

  use chrono::{NaiveTime, Utc};

  use super::*;
  use crate::novelty::{AbsenceKind, NoveltyState};

  /// A repository over a plain vector.
  #[derive(Default)]
  struct VecRepo {
    appointments: Vec<Appointment>,
    saves:        usize,
  }

  impl AppointmentRepository for VecRepo {
    type Error = Infallible;

    fn find_active_by_provider_and_date(
      &mut self,
      provider_id: Uuid,
      date: NaiveDate,
    ) -> Result<Vec<Appointment>, Infallible> {
      Ok(
        self
          .appointments
          .iter()
          .filter(|a| {
            a.provider_id == provider_id && a.date == date && a.state.is_reconcilable()
          })
          .cloned()
          .collect(),
      )
    }

    fn find_by_novelty_and_state(
      &mut self,
      novelty_id: Uuid,
      state: AppointmentState,
    ) -> Result<Vec<Appointment>, Infallible> {
      Ok(
        self
          .appointments
          .iter()
          .filter(|a| a.novelty_id == Some(novelty_id) && a.state == state)
          .cloned()
          .collect(),
      )
    }

    fn save(&mut self, appointment: &Appointment) -> Result<(), Infallible> {
      self.saves += 1;
      if let Some(slot) = self
        .appointments
        .iter_mut()
        .find(|a| a.appointment_id == appointment.appointment_id)
      {
        *slot = appointment.clone();
      }
      Ok(())
    }
  }

  impl VecRepo {
    fn get(&self, id: Uuid) -> &Appointment {
      self.appointments.iter().find(|a| a.appointment_id == id).unwrap()
    }
  }

  fn t(h: u32, m: u32) -> NaiveTime { NaiveTime::from_hms_opt(h, m, 0).unwrap() }

  fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2030, 8, 20).unwrap() }

  fn novelty(provider_id: Uuid, state: NoveltyState, kind: Option<AbsenceKind>) -> Novelty {
    let now = Utc::now();
    Novelty {
      novelty_id: Uuid::new_v4(),
      provider_id,
      date: date(),
      state,
      absence_kind: kind,
      absence_start: Some(t(10, 0)),
      absence_end: Some(t(20, 0)),
      entry_time: None,
      exit_time: None,
      reason: None,
      void_reason: None,
      voided_at: None,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn full_day_cancels_every_reconcilable_appointment() {
    let provider = Uuid::new_v4();
    let mut confirmed = Appointment::pending(provider, date(), t(15, 0));
    confirmed.state = AppointmentState::Confirmed;
    let mut finalized = Appointment::pending(provider, date(), t(9, 0));
    finalized.state = AppointmentState::Finalized;
    let pending = Appointment::pending(provider, date(), t(11, 0));
    let other_provider = Appointment::pending(Uuid::new_v4(), date(), t(11, 0));

    let mut repo = VecRepo {
      appointments: vec![
        pending.clone(),
        confirmed.clone(),
        finalized.clone(),
        other_provider.clone(),
      ],
      saves:        0,
    };
    let n = novelty(provider, NoveltyState::Absent, Some(AbsenceKind::FullDay));

    let notices = on_novelty_committed(&mut repo, &n).unwrap();
    assert_eq!(notices.len(), 2);

    for id in [pending.appointment_id, confirmed.appointment_id] {
      let a = repo.get(id);
      assert_eq!(a.state, AppointmentState::CancelledByNovelty);
      assert_eq!(a.novelty_id, Some(n.novelty_id));
      assert_eq!(a.cancellation_reason.as_deref(), Some("Provider novelty: Absent"));
    }
    assert_eq!(repo.get(finalized.appointment_id).state, AppointmentState::Finalized);
    assert_eq!(
      repo.get(other_provider.appointment_id).state,
      AppointmentState::Pending
    );
  }

  #[test]
  fn late_spares_appointment_at_arrival() {
    let provider = Uuid::new_v4();
    let early = Appointment::pending(provider, date(), t(10, 30));
    let on_time = Appointment::pending(provider, date(), t(11, 0));
    let mut repo = VecRepo {
      appointments: vec![early.clone(), on_time.clone()],
      saves:        0,
    };
    let mut n = novelty(provider, NoveltyState::Late, None);
    n.entry_time = Some(t(11, 0));

    let notices = on_novelty_committed(&mut repo, &n).unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].appointment().appointment_id, early.appointment_id);
    assert_eq!(repo.get(on_time.appointment_id).state, AppointmentState::Pending);
    assert_eq!(
      repo.get(early.appointment_id).cancellation_reason.as_deref(),
      Some("Provider novelty: Late")
    );
  }

  #[test]
  fn void_reactivates_only_its_own_cancellations() {
    let provider = Uuid::new_v4();
    let n = novelty(provider, NoveltyState::Absent, Some(AbsenceKind::FullDay));

    let mut ours = Appointment::pending(provider, date(), t(12, 0));
    ours.state = AppointmentState::CancelledByNovelty;
    ours.novelty_id = Some(n.novelty_id);
    ours.cancellation_reason = Some(cancellation_reason(&n));

    let mut unrelated = Appointment::pending(provider, date(), t(13, 0));
    unrelated.state = AppointmentState::Cancelled;
    unrelated.cancellation_reason = Some("client request".into());

    let mut other_novelty = Appointment::pending(provider, date(), t(14, 0));
    other_novelty.state = AppointmentState::CancelledByNovelty;
    other_novelty.novelty_id = Some(Uuid::new_v4());

    let mut repo = VecRepo {
      appointments: vec![ours.clone(), unrelated.clone(), other_novelty.clone()],
      saves:        0,
    };

    let notices = on_novelty_voided(&mut repo, &n).unwrap();
    assert_eq!(notices.len(), 1);
    assert!(matches!(&notices[0], Notice::Reactivation { appointment }
      if appointment.appointment_id == ours.appointment_id));

    let reactivated = repo.get(ours.appointment_id);
    assert_eq!(reactivated.state, AppointmentState::Pending);
    assert_eq!(reactivated.novelty_id, None);
    assert_eq!(reactivated.cancellation_reason, None);

    assert_eq!(repo.get(unrelated.appointment_id), &unrelated);
    assert_eq!(repo.get(other_novelty.appointment_id), &other_novelty);
  }

  #[test]
  fn voided_novelty_cancels_nothing() {
    let provider = Uuid::new_v4();
    let mut repo = VecRepo {
      appointments: vec![Appointment::pending(provider, date(), t(12, 0))],
      saves:        0,
    };
    let n = novelty(provider, NoveltyState::Voided, Some(AbsenceKind::FullDay));
    assert!(on_novelty_committed(&mut repo, &n).unwrap().is_empty());
    assert_eq!(repo.saves, 0);
  }
}
