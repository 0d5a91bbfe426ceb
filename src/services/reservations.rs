//! Reservation lifecycle. Every mutation locks the affected shop(s), reads the
//! shop's busy time, checks and updates the day book in memory, then hands
//! the new day book and the reservation row to the store in one atomic call.
//! Creates by non-admins also hold the user's lock so the quota count cannot
//! race with another of their creates.

use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

use super::KeyedLocks;
use crate::dtos::reservation::{CreateReservationRequest, UpdateReservationRequest};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::{MassageShop, NewReservation, Reservation, ReservationFilter, ScheduleWrite};
use crate::scheduling::TimeRange;
use crate::store::Store;

#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn Store>,
    shop_locks: KeyedLocks,
    user_locks: KeyedLocks,
    max_active: i64,
    prune_on_delete: bool,
}

impl ReservationService {
    pub fn new(store: Arc<dyn Store>, max_active: i64, prune_on_delete: bool) -> Self {
        Self {
            store,
            shop_locks: KeyedLocks::new(),
            user_locks: KeyedLocks::new(),
            max_active,
            prune_on_delete,
        }
    }

    async fn shop(&self, shop_id: i64) -> Result<MassageShop, AppError> {
        self.store
            .get_shop(shop_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No massage shop with the id of {shop_id}")))
    }

    async fn reservation(&self, id: i64) -> Result<Reservation, AppError> {
        self.store
            .get_reservation(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No reservation with the id of {id}")))
    }

    /// Locks the reservation's current shop plus `target` (defaulting to the
    /// current shop) and returns the reservation as read under those locks.
    /// If it moved to another shop while we waited, the locks are released
    /// and taken again for its new shop.
    async fn lock_reservation(
        &self,
        auth: &AuthContext,
        id: i64,
        target: Option<i64>,
        action: &str,
    ) -> Result<(Reservation, Vec<OwnedMutexGuard<()>>), AppError> {
        loop {
            let seen = self.reservation(id).await?;
            if !auth.can_act_for(seen.user_id) {
                return Err(AppError::unauthorized(format!(
                    "User with id of {} is not authorized to {action} this reservation",
                    auth.user_id
                )));
            }

            let guards = self
                .shop_locks
                .lock_many(&[seen.shop_id, target.unwrap_or(seen.shop_id)])
                .await;
            let current = self.reservation(id).await?;
            if current.shop_id == seen.shop_id {
                return Ok((current, guards));
            }

            drop(guards);
            debug!(reservation_id = id, from = seen.shop_id, to = current.shop_id, "reservation moved while waiting, relocking");
        }
    }

    pub async fn get(&self, auth: &AuthContext, id: i64) -> Result<Reservation, AppError> {
        let resv = self.reservation(id).await?;
        if !auth.can_act_for(resv.user_id) {
            return Err(AppError::unauthorized(format!(
                "User with id of {} is not authorized to view this reservation",
                auth.user_id
            )));
        }
        Ok(resv)
    }

    /// Admins see everything (optionally narrowed to one shop); other users
    /// only ever see their own reservations.
    pub async fn list(&self, auth: &AuthContext, shop_id: Option<i64>) -> Result<Vec<Reservation>, AppError> {
        let filter = if auth.is_admin() {
            ReservationFilter { user_id: None, shop_id }
        } else {
            ReservationFilter { user_id: Some(auth.user_id), shop_id }
        };
        self.store.list_reservations(filter).await
    }

    pub async fn create(
        &self,
        auth: &AuthContext,
        shop_id: i64,
        req: CreateReservationRequest,
    ) -> Result<Reservation, AppError> {
        let _user_guard = if auth.is_admin() {
            None
        } else {
            Some(self.user_locks.lock(auth.user_id).await)
        };
        let _guard = self.shop_locks.lock(shop_id).await;

        let shop = self.shop(shop_id).await?;

        if !auth.is_admin() {
            let held = self
                .store
                .count_reservations(ReservationFilter { user_id: Some(auth.user_id), shop_id: None })
                .await?;
            if held >= self.max_active {
                return Err(AppError::quota_exceeded(format!(
                    "User with id of {} has already created {} reservations",
                    auth.user_id, self.max_active
                )));
            }
        }

        let range = TimeRange::parse(&req.start_time, &req.end_time)?;
        range.validate_within(shop.open_time, shop.close_time)?;

        let mut day = shop.busy_time.day(req.resv_date);
        if let Err(e) = day.book(range) {
            warn!(shop_id, date = %req.resv_date, %range, "reservation rejected: slot taken");
            return Err(e.into());
        }

        let resv = self
            .store
            .create_reservation(
                vec![ScheduleWrite { shop_id, date: req.resv_date, day }],
                NewReservation {
                    user_id: auth.user_id,
                    shop_id,
                    resv_date: req.resv_date,
                    range,
                },
            )
            .await?;

        info!(reservation_id = resv.id, shop_id, date = %resv.resv_date, range = %resv.range, "reservation created");
        Ok(resv)
    }

    pub async fn update(
        &self,
        auth: &AuthContext,
        id: i64,
        req: UpdateReservationRequest,
    ) -> Result<Reservation, AppError> {
        let (current, _guards) = self.lock_reservation(auth, id, req.massage_shop, "update").await?;
        let target_shop_id = req.massage_shop.unwrap_or(current.shop_id);
        let old_shop = self.shop(current.shop_id).await?;

        let mut old_day = old_shop.busy_time.day(current.resv_date);
        if let Err(e) = old_day.remove(&current.range) {
            error!(
                reservation_id = id,
                shop_id = current.shop_id,
                date = %current.resv_date,
                range = %current.range,
                "busy time is missing an active reservation"
            );
            return Err(e.into());
        }

        let start = req.start_time.unwrap_or_else(|| current.range.start.to_string());
        let end = req.end_time.unwrap_or_else(|| current.range.end.to_string());
        let range = TimeRange::parse(&start, &end)?;
        let date = req.resv_date.unwrap_or(current.resv_date);

        let target_shop = if target_shop_id == old_shop.id {
            old_shop
        } else {
            self.shop(target_shop_id).await?
        };
        range.validate_within(target_shop.open_time, target_shop.close_time)?;

        let writes = if target_shop_id == current.shop_id && date == current.resv_date {
            old_day.book(range)?;
            vec![ScheduleWrite { shop_id: current.shop_id, date, day: old_day }]
        } else {
            let mut new_day = target_shop.busy_time.day(date);
            new_day.book(range)?;
            vec![
                ScheduleWrite { shop_id: current.shop_id, date: current.resv_date, day: old_day },
                ScheduleWrite { shop_id: target_shop_id, date, day: new_day },
            ]
        };

        let updated = Reservation {
            shop_id: target_shop_id,
            resv_date: date,
            range,
            ..current
        };
        let resv = self.store.update_reservation(writes, updated).await?;

        info!(reservation_id = id, shop_id = resv.shop_id, date = %resv.resv_date, range = %resv.range, "reservation updated");
        Ok(resv)
    }

    pub async fn delete(&self, auth: &AuthContext, id: i64) -> Result<(), AppError> {
        let (current, _guards) = self.lock_reservation(auth, id, None, "delete").await?;

        let writes = if self.prune_on_delete {
            let shop = self.shop(current.shop_id).await?;
            let mut day = shop.busy_time.day(current.resv_date);
            if let Err(e) = day.remove(&current.range) {
                error!(
                    reservation_id = id,
                    shop_id = current.shop_id,
                    date = %current.resv_date,
                    range = %current.range,
                    "busy time is missing an active reservation"
                );
                return Err(e.into());
            }
            vec![ScheduleWrite { shop_id: current.shop_id, date: current.resv_date, day }]
        } else {
            Vec::new()
        };

        if !self.store.delete_reservation(writes, id).await? {
            return Err(AppError::not_found(format!("No reservation with the id of {id}")));
        }

        info!(reservation_id = id, shop_id = current.shop_id, "reservation deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewShop, NewUser, Role, ShopChanges};
    use crate::scheduling::{DayBook, SchedulingError, TimeOfDay};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: ReservationService,
        shop_id: i64,
        alice: AuthContext,
        bob: AuthContext,
        admin: AuthContext,
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    async fn user(store: &MemoryStore, email: &str, role: Role) -> AuthContext {
        let user = store
            .create_user(NewUser {
                name: email.to_string(),
                telephone: None,
                email: email.to_string(),
                password_hash: "hash".to_string(),
                role,
            })
            .await
            .unwrap();
        AuthContext { user_id: user.id, role, name: user.name }
    }

    async fn fixture_with(prune_on_delete: bool) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let shop = store
            .create_shop(NewShop {
                name: "Lotus Spa".into(),
                address: "1 Silom Rd".into(),
                district: "Bang Rak".into(),
                province: "Bangkok".into(),
                postalcode: "10500".into(),
                tel: Some("02-000-0000".into()),
                open_time: TimeOfDay::parse("09:00 AM").unwrap(),
                close_time: TimeOfDay::parse("05:00 PM").unwrap(),
            })
            .await
            .unwrap();
        let alice = user(&store, "alice@example.com", Role::User).await;
        let bob = user(&store, "bob@example.com", Role::User).await;
        let admin = user(&store, "admin@example.com", Role::Admin).await;
        let service = ReservationService::new(store.clone(), 3, prune_on_delete);
        Fixture { store, service, shop_id: shop.id, alice, bob, admin }
    }

    async fn fixture() -> Fixture {
        fixture_with(true).await
    }

    fn req(start: &str, end: &str) -> CreateReservationRequest {
        CreateReservationRequest {
            resv_date: date(),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    impl Fixture {
        async fn day(&self) -> Vec<String> {
            self.day_of(self.shop_id, date()).await
        }

        async fn second_shop(&self) -> i64 {
            self.store
                .create_shop(NewShop {
                    name: "Orchid Spa".into(),
                    address: "3 Sathorn Rd".into(),
                    district: "Sathorn".into(),
                    province: "Bangkok".into(),
                    postalcode: "10120".into(),
                    tel: None,
                    open_time: TimeOfDay::parse("09:00 AM").unwrap(),
                    close_time: TimeOfDay::parse("05:00 PM").unwrap(),
                })
                .await
                .unwrap()
                .id
        }

        async fn day_of(&self, shop_id: i64, date: NaiveDate) -> Vec<String> {
            let shop = self.store.get_shop(shop_id).await.unwrap().unwrap();
            shop.busy_time.day(date).ranges().iter().map(ToString::to_string).collect()
        }
    }

    #[tokio::test]
    async fn create_records_range_in_busy_time() {
        let fx = fixture().await;
        let resv = fx
            .service
            .create(&fx.alice, fx.shop_id, req("02:30 PM", "03:30 PM"))
            .await
            .unwrap();
        assert_eq!(resv.user_id, fx.alice.user_id);
        assert_eq!(resv.range.to_string(), "02:30 PM - 03:30 PM");
        assert_eq!(fx.day().await, vec!["02:30 PM - 03:30 PM"]);
    }

    #[tokio::test]
    async fn create_outside_opening_hours_is_invalid_range() {
        let fx = fixture().await;
        let err = fx
            .service
            .create(&fx.alice, fx.shop_id, req("08:00 AM", "09:30 AM"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Scheduling(SchedulingError::InvalidRange(_))));
        assert!(fx.day().await.is_empty());
    }

    #[tokio::test]
    async fn create_with_bad_time_text_is_invalid_format() {
        let fx = fixture().await;
        let err = fx
            .service
            .create(&fx.alice, fx.shop_id, req("14:30", "03:30 PM"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Scheduling(SchedulingError::InvalidTimeFormat(_))));
    }

    #[tokio::test]
    async fn touching_booking_is_slot_taken_but_next_minute_fits() {
        let fx = fixture().await;
        fx.service.create(&fx.alice, fx.shop_id, req("10:00 AM", "11:00 AM")).await.unwrap();

        let err = fx
            .service
            .create(&fx.bob, fx.shop_id, req("11:00 AM", "12:00 PM"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Scheduling(SchedulingError::SlotTaken(_))));

        fx.service.create(&fx.bob, fx.shop_id, req("11:01 AM", "12:00 PM")).await.unwrap();
        assert_eq!(fx.day().await, vec!["10:00 AM - 11:00 AM", "11:01 AM - 12:00 PM"]);
    }

    #[tokio::test]
    async fn unknown_shop_is_not_found() {
        let fx = fixture().await;
        let err = fx.service.create(&fx.alice, 9999, req("10:00 AM", "11:00 AM")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn fourth_reservation_exceeds_quota_for_users_only() {
        let fx = fixture().await;
        for (start, end) in [("09:00 AM", "09:30 AM"), ("10:00 AM", "10:30 AM"), ("11:00 AM", "11:30 AM")] {
            fx.service.create(&fx.alice, fx.shop_id, req(start, end)).await.unwrap();
        }
        for (start, end) in [("01:00 PM", "01:30 PM"), ("02:00 PM", "02:30 PM"), ("03:00 PM", "03:30 PM")] {
            fx.service.create(&fx.admin, fx.shop_id, req(start, end)).await.unwrap();
        }

        let err = fx
            .service
            .create(&fx.alice, fx.shop_id, req("12:00 PM", "12:30 PM"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded(_)));

        fx.service.create(&fx.admin, fx.shop_id, req("12:00 PM", "12:30 PM")).await.unwrap();
    }

    #[tokio::test]
    async fn update_moves_range_and_keeps_day_size() {
        let fx = fixture().await;
        fx.service.create(&fx.bob, fx.shop_id, req("09:00 AM", "10:00 AM")).await.unwrap();
        let resv = fx.service.create(&fx.alice, fx.shop_id, req("11:00 AM", "12:00 PM")).await.unwrap();

        let updated = fx
            .service
            .update(
                &fx.alice,
                resv.id,
                UpdateReservationRequest {
                    start_time: Some("01:00 PM".into()),
                    end_time: Some("02:00 PM".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.range.to_string(), "01:00 PM - 02:00 PM");
        assert_eq!(fx.day().await, vec!["09:00 AM - 10:00 AM", "01:00 PM - 02:00 PM"]);
    }

    #[tokio::test]
    async fn update_may_overlap_its_own_old_range() {
        let fx = fixture().await;
        let resv = fx.service.create(&fx.alice, fx.shop_id, req("11:00 AM", "12:00 PM")).await.unwrap();

        fx.service
            .update(
                &fx.alice,
                resv.id,
                UpdateReservationRequest { end_time: Some("12:30 PM".into()), ..Default::default() },
            )
            .await
            .unwrap();

        assert_eq!(fx.day().await, vec!["11:00 AM - 12:30 PM"]);
    }

    #[tokio::test]
    async fn rejected_update_leaves_schedule_untouched() {
        let fx = fixture().await;
        fx.service.create(&fx.bob, fx.shop_id, req("01:00 PM", "02:00 PM")).await.unwrap();
        let resv = fx.service.create(&fx.alice, fx.shop_id, req("11:00 AM", "12:00 PM")).await.unwrap();

        let err = fx
            .service
            .update(
                &fx.alice,
                resv.id,
                UpdateReservationRequest {
                    start_time: Some("01:30 PM".into()),
                    end_time: Some("02:30 PM".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Scheduling(SchedulingError::SlotTaken(_))));
        assert_eq!(fx.day().await, vec!["11:00 AM - 12:00 PM", "01:00 PM - 02:00 PM"]);
        assert_eq!(fx.store.get_reservation(resv.id).await.unwrap().unwrap(), resv);
    }

    #[tokio::test]
    async fn update_to_another_date_moves_entry() {
        let fx = fixture().await;
        let resv = fx.service.create(&fx.alice, fx.shop_id, req("11:00 AM", "12:00 PM")).await.unwrap();
        let next_day = date().succ_opt().unwrap();

        fx.service
            .update(
                &fx.alice,
                resv.id,
                UpdateReservationRequest { resv_date: Some(next_day), ..Default::default() },
            )
            .await
            .unwrap();

        assert!(fx.day().await.is_empty());
        assert_eq!(fx.day_of(fx.shop_id, next_day).await, vec!["11:00 AM - 12:00 PM"]);
    }

    #[tokio::test]
    async fn update_to_another_shop_checks_its_hours() {
        let fx = fixture().await;
        let late_shop = fx
            .store
            .create_shop(NewShop {
                name: "Night Owl".into(),
                address: "2 Silom Rd".into(),
                district: "Bang Rak".into(),
                province: "Bangkok".into(),
                postalcode: "10500".into(),
                tel: None,
                open_time: TimeOfDay::parse("01:00 PM").unwrap(),
                close_time: TimeOfDay::parse("11:00 PM").unwrap(),
            })
            .await
            .unwrap();
        let resv = fx.service.create(&fx.alice, fx.shop_id, req("11:00 AM", "12:00 PM")).await.unwrap();

        let err = fx
            .service
            .update(
                &fx.alice,
                resv.id,
                UpdateReservationRequest { massage_shop: Some(late_shop.id), ..Default::default() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Scheduling(SchedulingError::InvalidRange(_))));

        let moved = fx
            .service
            .update(
                &fx.alice,
                resv.id,
                UpdateReservationRequest {
                    massage_shop: Some(late_shop.id),
                    start_time: Some("07:00 PM".into()),
                    end_time: Some("08:00 PM".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.shop_id, late_shop.id);
        assert!(fx.day().await.is_empty());
        assert_eq!(fx.day_of(late_shop.id, date()).await, vec!["07:00 PM - 08:00 PM"]);
    }

    #[tokio::test]
    async fn update_detects_diverged_schedule() {
        let fx = fixture().await;
        let resv = fx.service.create(&fx.alice, fx.shop_id, req("11:00 AM", "12:00 PM")).await.unwrap();

        // Wipe the day book behind the service's back.
        fx.store
            .update_reservation(
                vec![ScheduleWrite { shop_id: fx.shop_id, date: date(), day: DayBook::new() }],
                resv.clone(),
            )
            .await
            .unwrap();

        let err = fx
            .service
            .update(
                &fx.alice,
                resv.id,
                UpdateReservationRequest { end_time: Some("12:30 PM".into()), ..Default::default() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Scheduling(SchedulingError::NotFound(_))));
    }

    #[tokio::test]
    async fn non_owner_cannot_change_or_delete() {
        let fx = fixture().await;
        let resv = fx.service.create(&fx.alice, fx.shop_id, req("11:00 AM", "12:00 PM")).await.unwrap();

        let err = fx
            .service
            .update(&fx.bob, resv.id, UpdateReservationRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let err = fx.service.delete(&fx.bob, resv.id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let err = fx.service.get(&fx.bob, resv.id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        fx.service.delete(&fx.admin, resv.id).await.unwrap();
    }

    #[tokio::test]
    async fn delete_prunes_busy_time() {
        let fx = fixture().await;
        let resv = fx.service.create(&fx.alice, fx.shop_id, req("11:00 AM", "12:00 PM")).await.unwrap();

        fx.service.delete(&fx.alice, resv.id).await.unwrap();

        assert!(fx.day().await.is_empty());
        assert!(fx.store.get_reservation(resv.id).await.unwrap().is_none());
        let err = fx.service.delete(&fx.alice, resv.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_without_pruning_keeps_busy_time() {
        let fx = fixture_with(false).await;
        let resv = fx.service.create(&fx.alice, fx.shop_id, req("11:00 AM", "12:00 PM")).await.unwrap();

        fx.service.delete(&fx.alice, resv.id).await.unwrap();

        assert!(fx.store.get_reservation(resv.id).await.unwrap().is_none());
        assert_eq!(fx.day().await, vec!["11:00 AM - 12:00 PM"]);
    }

    #[tokio::test]
    async fn list_scopes_by_role() {
        let fx = fixture().await;
        fx.service.create(&fx.alice, fx.shop_id, req("09:00 AM", "10:00 AM")).await.unwrap();
        fx.service.create(&fx.bob, fx.shop_id, req("11:00 AM", "12:00 PM")).await.unwrap();

        let mine = fx.service.list(&fx.alice, None).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, fx.alice.user_id);

        assert_eq!(fx.service.list(&fx.admin, None).await.unwrap().len(), 2);
        assert_eq!(fx.service.list(&fx.admin, Some(fx.shop_id)).await.unwrap().len(), 2);
        assert!(fx.service.list(&fx.admin, Some(9999)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn shrinking_shop_hours_blocks_out_of_hours_update() {
        let fx = fixture().await;
        let resv = fx.service.create(&fx.alice, fx.shop_id, req("04:00 PM", "04:30 PM")).await.unwrap();
        fx.store
            .update_shop(
                fx.shop_id,
                ShopChanges { close_time: Some(TimeOfDay::parse("04:00 PM").unwrap()), ..Default::default() },
            )
            .await
            .unwrap();

        let err = fx
            .service
            .update(
                &fx.alice,
                resv.id,
                UpdateReservationRequest { end_time: Some("04:45 PM".into()), ..Default::default() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Scheduling(SchedulingError::InvalidRange(_))));
        assert_eq!(fx.day().await, vec!["04:00 PM - 04:30 PM"]);
    }

    #[tokio::test]
    async fn concurrent_bookings_for_same_slot_admit_one() {
        let fx = fixture().await;
        let a = fx.service.clone();
        let b = fx.service.clone();
        let (alice, bob, shop_id) = (fx.alice.clone(), fx.bob.clone(), fx.shop_id);

        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.create(&alice, shop_id, req("10:00 AM", "11:00 AM")).await }),
            tokio::spawn(async move { b.create(&bob, shop_id, req("10:30 AM", "11:30 AM")).await }),
        );
        let results = [ra.unwrap(), rb.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(fx.day().await.len(), 1);
    }

    #[tokio::test]
    async fn update_relocks_when_reservation_moves_shops_meanwhile() {
        let fx = fixture().await;
        let other = fx.second_shop().await;
        let resv = fx.service.create(&fx.alice, fx.shop_id, req("11:00 AM", "12:00 PM")).await.unwrap();

        let home_guard = fx.service.shop_locks.lock(fx.shop_id).await;
        let service = fx.service.clone();
        let alice = fx.alice.clone();
        let resv_id = resv.id;
        let pending = tokio::spawn(async move {
            service
                .update(
                    &alice,
                    resv_id,
                    UpdateReservationRequest {
                        start_time: Some("01:00 PM".into()),
                        end_time: Some("02:00 PM".into()),
                        ..Default::default()
                    },
                )
                .await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // A concurrent move to the other shop, done while holding both shops.
        let other_guard = fx.service.shop_locks.lock(other).await;
        let mut home_day = fx.store.get_shop(fx.shop_id).await.unwrap().unwrap().busy_time.day(date());
        home_day.remove(&resv.range).unwrap();
        let mut other_day = DayBook::new();
        other_day.book(resv.range).unwrap();
        fx.store
            .update_reservation(
                vec![
                    ScheduleWrite { shop_id: fx.shop_id, date: date(), day: home_day },
                    ScheduleWrite { shop_id: other, date: date(), day: other_day },
                ],
                Reservation { shop_id: other, ..resv.clone() },
            )
            .await
            .unwrap();
        drop(home_guard);

        // The update must now wait for the other shop's lock.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());
        assert_eq!(fx.day_of(other, date()).await, vec!["11:00 AM - 12:00 PM"]);

        drop(other_guard);
        let updated = pending.await.unwrap().unwrap();
        assert_eq!(updated.shop_id, other);
        assert!(fx.day().await.is_empty());
        assert_eq!(fx.day_of(other, date()).await, vec!["01:00 PM - 02:00 PM"]);
    }

    #[tokio::test]
    async fn delete_relocks_when_reservation_moves_shops_meanwhile() {
        let fx = fixture().await;
        let other = fx.second_shop().await;
        let resv = fx.service.create(&fx.alice, fx.shop_id, req("11:00 AM", "12:00 PM")).await.unwrap();

        let home_guard = fx.service.shop_locks.lock(fx.shop_id).await;
        let service = fx.service.clone();
        let alice = fx.alice.clone();
        let resv_id = resv.id;
        let pending = tokio::spawn(async move { service.delete(&alice, resv_id).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let other_guard = fx.service.shop_locks.lock(other).await;
        let mut other_day = DayBook::new();
        other_day.book(resv.range).unwrap();
        fx.store
            .update_reservation(
                vec![
                    ScheduleWrite { shop_id: fx.shop_id, date: date(), day: DayBook::new() },
                    ScheduleWrite { shop_id: other, date: date(), day: other_day },
                ],
                Reservation { shop_id: other, ..resv.clone() },
            )
            .await
            .unwrap();
        drop(home_guard);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        drop(other_guard);
        pending.await.unwrap().unwrap();
        assert!(fx.day_of(other, date()).await.is_empty());
        assert!(fx.store.get_reservation(resv_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_creates_at_different_shops_respect_quota() {
        let fx = fixture().await;
        let other = fx.second_shop().await;
        fx.service.create(&fx.alice, fx.shop_id, req("09:00 AM", "09:30 AM")).await.unwrap();
        fx.service.create(&fx.alice, fx.shop_id, req("10:00 AM", "10:30 AM")).await.unwrap();

        let a = fx.service.clone();
        let b = fx.service.clone();
        let (alice_a, alice_b, shop_id) = (fx.alice.clone(), fx.alice.clone(), fx.shop_id);
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.create(&alice_a, shop_id, req("01:00 PM", "01:30 PM")).await }),
            tokio::spawn(async move { b.create(&alice_b, other, req("01:00 PM", "01:30 PM")).await }),
        );
        let results = [ra.unwrap(), rb.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(r, Err(AppError::QuotaExceeded(_)))));
        assert_eq!(fx.service.list(&fx.alice, None).await.unwrap().len(), 3);
    }
}
