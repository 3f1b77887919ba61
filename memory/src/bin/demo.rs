//! Classbook Demo
//!
//! Walks the capacity engine through its three write paths against the
//! in-memory store:
//! - Lesson creation and a direct capacity edit
//! - Direct enroll / unenroll
//! - A multi-lesson order, plus a failing order that rolls back
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin demo
//! ```

use classbook_core::{
    BookingConfig, BookingEnvironment, EnrollmentMutator, LessonService, LineItemRequest,
    OrderCoordinator, SystemClock, UserKey,
    directory::UserRecord,
    lessons::LessonPatch,
};
use classbook_memory::{MemoryDirectory, MemoryStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,classbook_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("\n📚 ============================================");
    println!("   Classbook Capacity Engine - Demo");
    println!("============================================\n");

    let teacher = UserKey::new("teacher@example.com");
    let ada = UserKey::new("ada@example.com");

    let directory = MemoryDirectory::with_users([
        UserRecord {
            key: teacher.clone(),
            name: "The Teacher".to_string(),
        },
        UserRecord {
            key: ada.clone(),
            name: "Ada".to_string(),
        },
    ]);
    let env = BookingEnvironment::new(
        Arc::new(MemoryStore::new()),
        Arc::new(directory),
        Arc::new(SystemClock),
        BookingConfig::default(),
    );
    let lessons = LessonService::new(env.clone());
    let enrollment = EnrollmentMutator::new(env.clone());
    let orders = OrderCoordinator::new(env);

    // Two lessons to sell seats in.
    println!("📋 Creating lessons...");
    let piano = lessons
        .create(
            classbook_core::NewLesson {
                name: "Beginner Piano".to_string(),
                topic: "Music".to_string(),
                location: "Room 4".to_string(),
                description: "Scales and first pieces".to_string(),
                image: None,
                owner: teacher.clone(),
                price: classbook_core::Money::from_cents(2000),
                capacity: 5,
            },
        )
        .await?;
    let chess = lessons
        .create(
            classbook_core::NewLesson {
                name: "Chess Club".to_string(),
                topic: "Games".to_string(),
                location: "Library".to_string(),
                description: "Openings and endgames".to_string(),
                image: None,
                owner: teacher.clone(),
                price: classbook_core::Money::from_cents(1000),
                capacity: 6,
            },
        )
        .await?;
    println!(
        "✓ {} ({} seats), {} ({} seats)\n",
        piano.name, piano.available_seats, chess.name, chess.available_seats
    );

    // Direct enrollment path.
    println!("🎓 Enrolling Ada for 1 piano seat...");
    let piano = enrollment.add_participant(piano.id, &ada, 1).await?;
    println!("✓ {} seats left in {}\n", piano.available_seats, piano.name);

    // A multi-lesson order.
    println!("🛒 Placing an order: 2 piano seats + 3 chess seats...");
    let order = orders
        .place_order(
            ada.clone(),
            classbook_core::ContactInfo {
                name: "Ada".to_string(),
                phone: "0700 000000".to_string(),
            },
            &[
                LineItemRequest {
                    lesson_id: piano.id,
                    seats: 2,
                },
                LineItemRequest {
                    lesson_id: chess.id,
                    seats: 3,
                },
            ],
        )
        .await?;
    println!("✓ Order {} committed, total {}\n", order.id, order.total_price);

    // An order that cannot be satisfied rolls back entirely.
    println!("🛒 Placing an order that exceeds the piano seats left...");
    let failed = orders
        .place_order(
            ada.clone(),
            classbook_core::ContactInfo {
                name: "Ada".to_string(),
                phone: "0700 000000".to_string(),
            },
            &[
                LineItemRequest {
                    lesson_id: chess.id,
                    seats: 1,
                },
                LineItemRequest {
                    lesson_id: piano.id,
                    seats: 4,
                },
            ],
        )
        .await;
    match failed {
        Err(err) => println!("✓ Rejected as expected: {err}"),
        Ok(order) => println!("✗ Unexpectedly committed order {}", order.id),
    }
    let chess = lessons.get(chess.id).await?;
    println!(
        "✓ Chess allocation untouched by the failed order: {} seats left\n",
        chess.available_seats
    );

    // A capacity edit that respects booked seats.
    println!("✏️  Shrinking piano capacity to exactly the booked seats...");
    let piano = lessons
        .update(
            piano.id,
            &LessonPatch {
                capacity: Some(3),
                ..LessonPatch::default()
            },
        )
        .await?;
    println!(
        "✓ {}: capacity {}, {} available\n",
        piano.name, piano.capacity, piano.available_seats
    );

    println!("Done.");
    Ok(())
}
