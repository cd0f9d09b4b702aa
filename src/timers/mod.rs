//! Timer and category collections: models, form input, change signals and
//! the repository that ties them to storage.

pub mod categories;
pub mod form;
pub mod models;
pub mod notifier;
pub mod repository;

pub use categories::{category_options, merge_category_labels};
pub use form::{
    convert_24_hour_to_12_hour, formatted_24_hour_time, CategoryChoice, Meridiem, TimerDraft,
};
pub use models::{format_instant, parse_instant, CategoryOption, Timer};
pub use notifier::{Notifier, Signal, Subscription};
pub use repository::TimerRepository;
