//! Scenario tests for handlers
//!
//! Run against `MemoryLedgerStore` with recording notification fakes.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use crate::domain::{
        Amount, Course, DomainError, OperationContext, RatingAggregate, UserContact,
    };
    use crate::error::AppError;
    use crate::handlers::{
        BuyCourseCommand, CreateReviewCommand, PurchaseHandler, ReviewHandler, TransferCommand,
        UpdateReviewCommand, WalletHandler,
    };
    use crate::notify::{FakeMailer, FakeNotificationSink, PurchaseNotifier, NEW_STUDENT_TITLE};
    use crate::storage::{
        CatalogStore, EnrollmentStore, LedgerStore, MemoryLedgerStore, WalletStore,
    };

    struct Fixture {
        store: Arc<MemoryLedgerStore>,
        mailer: FakeMailer,
        sink: FakeNotificationSink,
        instructor: UserContact,
        student: UserContact,
        course: Course,
    }

    impl Fixture {
        async fn new(price: Decimal, student_funds: Option<Decimal>) -> Self {
            let store = Arc::new(MemoryLedgerStore::new());
            let instructor = contact("Ina");
            let student = contact("Sam");
            store.register_user(instructor.clone()).await;
            store.register_user(student.clone()).await;

            if let Some(funds) = student_funds {
                let amount = Amount::new(funds).unwrap();
                store
                    .topup(student.id, &amount, &format!("seed-{}", student.id))
                    .await
                    .unwrap();
            }

            let course = Course {
                id: Uuid::new_v4(),
                title: "Rust 101".to_string(),
                instructor_id: instructor.id,
                price,
                rating: RatingAggregate::empty(),
            };
            store.register_course(course.clone()).await;

            Self {
                store,
                mailer: FakeMailer::new(),
                sink: FakeNotificationSink::new(),
                instructor,
                student,
                course,
            }
        }

        fn dyn_store(&self) -> Arc<dyn LedgerStore> {
            self.store.clone()
        }

        fn purchase_handler(&self) -> PurchaseHandler {
            let notifier = PurchaseNotifier::new(
                self.dyn_store(),
                Arc::new(self.mailer.clone()),
                Arc::new(self.sink.clone()),
            );
            PurchaseHandler::new(self.dyn_store(), notifier)
        }

        fn review_handler(&self) -> ReviewHandler {
            ReviewHandler::new(self.dyn_store())
        }

        fn as_student(&self) -> OperationContext {
            context_for(&self.student)
        }

        async fn balance(&self, user_id: Uuid) -> Decimal {
            self.store.get_wallet(user_id).await.unwrap().balance.value()
        }

        async fn enrolled(&self) -> bool {
            self.store
                .is_enrolled(self.student.id, self.course.id)
                .await
                .unwrap()
        }
    }

    fn contact(name: &str) -> UserContact {
        UserContact {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    fn context_for(user: &UserContact) -> OperationContext {
        OperationContext::new()
            .with_request_user(user.id)
            .with_request_user_profile(user.name.clone(), user.email.clone())
            .with_correlation_id(Uuid::new_v4())
    }

    /// Poll until detached side effects have landed
    async fn wait_until<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    // =========================================================================
    // BuyCourse
    // =========================================================================

    #[tokio::test]
    async fn test_purchase_moves_price_and_enrolls() {
        let fx = Fixture::new(dec!(40), Some(dec!(100))).await;
        let handler = fx.purchase_handler();

        let result = handler
            .execute(BuyCourseCommand::new(fx.course.id), &fx.as_student())
            .await
            .unwrap();

        assert_eq!(result.student_id, fx.student.id);
        assert_eq!(result.instructor_id, fx.instructor.id);
        assert_eq!(result.price, dec!(40));
        assert!(result.transaction_id.is_some());

        assert_eq!(fx.balance(fx.student.id).await, dec!(60));
        assert_eq!(fx.balance(fx.instructor.id).await, dec!(40));
        assert_eq!(fx.store.list_by_course(fx.course.id).await.unwrap().len(), 1);

        // Retry is rejected and charges nothing
        let retry = handler
            .execute(BuyCourseCommand::new(fx.course.id), &fx.as_student())
            .await;
        assert!(matches!(retry, Err(AppError::AlreadyEnrolled)));
        assert_eq!(fx.balance(fx.student.id).await, dec!(60));
        assert_eq!(fx.balance(fx.instructor.id).await, dec!(40));
    }

    #[tokio::test]
    async fn test_purchase_notifies_instructor() {
        let fx = Fixture::new(dec!(40), Some(dec!(100))).await;

        fx.purchase_handler()
            .execute(BuyCourseCommand::new(fx.course.id), &fx.as_student())
            .await
            .unwrap();

        wait_until(|| fx.mailer.calls().len() == 1 && fx.sink.notifications().len() == 1).await;

        let mail = &fx.mailer.calls()[0];
        assert_eq!(mail.to, fx.instructor.email);
        assert_eq!(mail.subject, NEW_STUDENT_TITLE);
        assert!(mail.body.contains("Sam (sam@example.com)"));

        let note = &fx.sink.notifications()[0];
        assert_eq!(note.user_id, fx.instructor.id);
        assert_eq!(note.title, NEW_STUDENT_TITLE);
        assert_eq!(note.detail, "Rust 101 has been purchased by Sam");
    }

    #[tokio::test]
    async fn test_insufficient_funds_changes_nothing() {
        let fx = Fixture::new(dec!(40), Some(dec!(10))).await;

        let result = fx
            .purchase_handler()
            .execute(BuyCourseCommand::new(fx.course.id), &fx.as_student())
            .await;

        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::InsufficientFunds { .. }))
        ));
        assert_eq!(fx.balance(fx.student.id).await, dec!(10));
        assert_eq!(fx.balance(fx.instructor.id).await, dec!(0));
        assert!(!fx.enrolled().await);
        assert!(fx.mailer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_purchases_enroll_once() {
        let fx = Arc::new(Fixture::new(dec!(40), Some(dec!(100))).await);
        let attempts = 16;

        let mut tasks = Vec::new();
        for _ in 0..attempts {
            let fx = Arc::clone(&fx);
            tasks.push(tokio::spawn(async move {
                fx.purchase_handler()
                    .execute(BuyCourseCommand::new(fx.course.id), &fx.as_student())
                    .await
            }));
        }

        let mut successes = 0;
        let mut already_enrolled = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AppError::AlreadyEnrolled) => already_enrolled += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(already_enrolled, attempts - 1);
        assert_eq!(fx.balance(fx.student.id).await, dec!(60));
        assert_eq!(fx.balance(fx.instructor.id).await, dec!(40));
        assert!(fx.store.ledger_totals().await.unwrap().is_balanced());
    }

    #[tokio::test]
    async fn test_free_course_enrolls_without_transfer() {
        let fx = Fixture::new(Decimal::ZERO, None).await;

        let result = fx
            .purchase_handler()
            .execute(BuyCourseCommand::new(fx.course.id), &fx.as_student())
            .await
            .unwrap();

        assert!(result.transaction_id.is_none());
        assert!(fx.enrolled().await);
        assert!(fx
            .store
            .list_transactions(fx.student.id, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_instructor_cannot_buy_own_course() {
        let fx = Fixture::new(dec!(40), Some(dec!(100))).await;

        let result = fx
            .purchase_handler()
            .execute(
                BuyCourseCommand::new(fx.course.id),
                &context_for(&fx.instructor),
            )
            .await;

        assert!(matches!(result, Err(AppError::Domain(DomainError::OwnCourse))));
    }

    #[tokio::test]
    async fn test_unknown_course_and_missing_identity() {
        let fx = Fixture::new(dec!(40), Some(dec!(100))).await;
        let handler = fx.purchase_handler();

        let unknown = Uuid::new_v4();
        let result = handler
            .execute(BuyCourseCommand::new(unknown), &fx.as_student())
            .await;
        assert!(matches!(result, Err(AppError::CourseNotFound(id)) if id == unknown));

        let result = handler
            .execute(BuyCourseCommand::new(fx.course.id), &OperationContext::new())
            .await;
        assert!(matches!(result, Err(AppError::MissingHeader(_))));
    }

    #[tokio::test]
    async fn test_side_effect_failure_keeps_purchase() {
        let fx = Fixture::new(dec!(40), Some(dec!(100))).await;
        fx.mailer.set_fail(true);

        let result = fx
            .purchase_handler()
            .execute(BuyCourseCommand::new(fx.course.id), &fx.as_student())
            .await;

        assert!(result.is_ok());
        assert!(fx.enrolled().await);
        wait_until(|| fx.sink.notifications().len() == 1).await;
        assert!(fx.mailer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_as_internal() {
        let fx = Fixture::new(dec!(40), Some(dec!(100))).await;
        fx.store.set_fail_on_write(true).await;

        let result = fx
            .purchase_handler()
            .execute(BuyCourseCommand::new(fx.course.id), &fx.as_student())
            .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        fx.store.set_fail_on_write(false).await;
        assert!(!fx.enrolled().await);
        assert_eq!(fx.balance(fx.student.id).await, dec!(100));
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    async fn enrolled_reviewer(fx: &Fixture, name: &str) -> UserContact {
        let user = contact(name);
        fx.store.register_user(user.clone()).await;
        fx.store
            .create_enrollment(user.id, fx.course.id)
            .await
            .unwrap();
        user
    }

    #[tokio::test]
    async fn test_review_requires_enrollment() {
        let fx = Fixture::new(dec!(40), None).await;

        let result = fx
            .review_handler()
            .create(
                CreateReviewCommand::new(fx.course.id, 5, "Great".to_string()),
                &fx.as_student(),
            )
            .await;

        assert!(matches!(result, Err(AppError::NotEnrolled)));
        let course = fx.store.get_course(fx.course.id).await.unwrap();
        assert_eq!(course.rating.count(), 0);
    }

    #[tokio::test]
    async fn test_rating_aggregate_follows_reviews() {
        let fx = Fixture::new(dec!(40), None).await;
        let handler = fx.review_handler();

        let mut review_ids = Vec::new();
        for (i, score) in [4, 5, 3].into_iter().enumerate() {
            let user = enrolled_reviewer(&fx, &format!("Reviewer{}", i)).await;
            let result = handler
                .create(
                    CreateReviewCommand::new(fx.course.id, score, String::new()),
                    &context_for(&user),
                )
                .await
                .unwrap();
            review_ids.push((user, result.review.unwrap().id));
        }

        let course = fx.store.get_course(fx.course.id).await.unwrap();
        assert_eq!(course.rating.mean(), 4.0);
        assert_eq!(course.rating.count(), 3);

        // Remove the 5
        let (author, review_id) = &review_ids[1];
        let result = handler.delete(*review_id, &context_for(author)).await.unwrap();
        assert_eq!(result.course_rating.rating, 3.5);
        assert_eq!(result.course_rating.rating_count, 2);

        // 4 -> 2 keeps the count
        let (author, review_id) = &review_ids[0];
        let result = handler
            .update(
                UpdateReviewCommand::new(*review_id).with_rating(2),
                &context_for(author),
            )
            .await
            .unwrap();
        assert_eq!(result.course_rating.rating, 2.5);
        assert_eq!(result.course_rating.rating_count, 2);
    }

    #[tokio::test]
    async fn test_duplicate_review_rejected() {
        let fx = Fixture::new(dec!(40), None).await;
        let user = enrolled_reviewer(&fx, "Dup").await;
        let handler = fx.review_handler();

        handler
            .create(
                CreateReviewCommand::new(fx.course.id, 4, String::new()),
                &context_for(&user),
            )
            .await
            .unwrap();
        let second = handler
            .create(
                CreateReviewCommand::new(fx.course.id, 1, String::new()),
                &context_for(&user),
            )
            .await;

        assert!(matches!(second, Err(AppError::AlreadyReviewed)));
        let course = fx.store.get_course(fx.course.id).await.unwrap();
        assert_eq!(course.rating.count(), 1);
        assert_eq!(course.rating.mean(), 4.0);
    }

    #[tokio::test]
    async fn test_only_author_may_change_review() {
        let fx = Fixture::new(dec!(40), None).await;
        let author = enrolled_reviewer(&fx, "Author").await;
        let other = enrolled_reviewer(&fx, "Other").await;
        let handler = fx.review_handler();

        let created = handler
            .create(
                CreateReviewCommand::new(fx.course.id, 4, "ok".to_string()),
                &context_for(&author),
            )
            .await
            .unwrap();
        let review_id = created.review.unwrap().id;

        let update = handler
            .update(
                UpdateReviewCommand::new(review_id).with_rating(1),
                &context_for(&other),
            )
            .await;
        assert!(matches!(update, Err(AppError::NotYourResource)));

        let delete = handler.delete(review_id, &context_for(&other)).await;
        assert!(matches!(delete, Err(AppError::NotYourResource)));

        let course = fx.store.get_course(fx.course.id).await.unwrap();
        assert_eq!(course.rating.mean(), 4.0);
    }

    #[tokio::test]
    async fn test_invalid_score_rejected() {
        let fx = Fixture::new(dec!(40), None).await;
        let user = enrolled_reviewer(&fx, "Bad").await;

        let result = fx
            .review_handler()
            .create(
                CreateReviewCommand::new(fx.course.id, 6, String::new()),
                &context_for(&user),
            )
            .await;

        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::InvalidScore(6)))
        ));
    }

    #[tokio::test]
    async fn test_feedback_only_update_keeps_aggregate() {
        let fx = Fixture::new(dec!(40), None).await;
        let user = enrolled_reviewer(&fx, "Edit").await;
        let handler = fx.review_handler();

        let created = handler
            .create(
                CreateReviewCommand::new(fx.course.id, 3, "meh".to_string()),
                &context_for(&user),
            )
            .await
            .unwrap();
        let review_id = created.review.unwrap().id;

        let result = handler
            .update(
                UpdateReviewCommand::new(review_id).with_feedback("better now".to_string()),
                &context_for(&user),
            )
            .await
            .unwrap();

        assert_eq!(result.review.unwrap().feedback, "better now");
        assert_eq!(result.course_rating.rating, 3.0);

        let empty = handler
            .update(UpdateReviewCommand::new(review_id), &context_for(&user))
            .await;
        assert!(matches!(empty, Err(AppError::InvalidRequest(_))));
    }

    // =========================================================================
    // Wallet
    // =========================================================================

    #[tokio::test]
    async fn test_transfer_conserves_money() {
        let fx = Fixture::new(dec!(40), Some(dec!(100))).await;
        let handler = WalletHandler::new(fx.dyn_store());

        let result = handler
            .transfer(
                TransferCommand::new(fx.instructor.id, "25.50".to_string()),
                &fx.as_student(),
            )
            .await
            .unwrap();

        assert_eq!(result.amount, dec!(25.50));
        assert_eq!(result.status, "completed");
        assert_eq!(fx.balance(fx.student.id).await, dec!(74.50));
        assert_eq!(fx.balance(fx.instructor.id).await, dec!(25.50));

        let balance = handler.balance(&fx.as_student()).await.unwrap();
        assert_eq!(balance.balance, dec!(74.50));

        let history = handler.history(None, &fx.as_student()).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_transfer_rejects_bad_input() {
        let fx = Fixture::new(dec!(40), Some(dec!(100))).await;
        let handler = WalletHandler::new(fx.dyn_store());

        let zero = handler
            .transfer(
                TransferCommand::new(fx.instructor.id, "0".to_string()),
                &fx.as_student(),
            )
            .await;
        assert!(matches!(
            zero,
            Err(AppError::Domain(DomainError::InvalidAmount(_)))
        ));

        let to_self = handler
            .transfer(
                TransferCommand::new(fx.student.id, "5".to_string()),
                &fx.as_student(),
            )
            .await;
        assert!(matches!(
            to_self,
            Err(AppError::Domain(DomainError::SelfTransfer))
        ));

        let too_much = handler
            .transfer(
                TransferCommand::new(fx.instructor.id, "100.01".to_string()),
                &fx.as_student(),
            )
            .await;
        assert!(matches!(
            too_much,
            Err(AppError::Domain(DomainError::InsufficientFunds { .. }))
        ));

        let unknown = handler
            .transfer(
                TransferCommand::new(Uuid::new_v4(), "5".to_string()),
                &fx.as_student(),
            )
            .await;
        assert!(matches!(unknown, Err(AppError::WalletNotFound(_))));

        assert_eq!(fx.balance(fx.student.id).await, dec!(100));
    }
}
