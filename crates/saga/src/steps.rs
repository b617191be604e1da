//! Flow names and step labels.
//!
//! Step labels prefix every error message returned to the client.

pub const BOOK_CAR: &str = "book_car";
pub const CANCEL_RENTAL: &str = "cancel_rental";
pub const FINISH_RENTAL: &str = "finish_rental";

pub const STEP_PARSE_DATE_FROM: &str = "parse date from";
pub const STEP_PARSE_DATE_TO: &str = "parse date to";
pub const STEP_CHECK_DATES: &str = "check rent dates";
pub const STEP_GET_CAR: &str = "get car";
pub const STEP_BOOK_CAR: &str = "book car";
pub const STEP_CREATE_PAYMENT: &str = "Payment Service unavailable";
pub const STEP_CREATE_RENTAL: &str = "create rental";
pub const STEP_REVERT_BOOK: &str = "revert book";
pub const STEP_REVERT_PAYMENT: &str = "revert payment";

pub const STEP_GET_USER_RENTAL: &str = "get user rental";
pub const STEP_MAKE_CAR_AVAILABLE: &str = "make car available";
pub const STEP_CANCEL_RENTAL: &str = "cancel rental";
pub const STEP_FINISH_RENTAL: &str = "finish rental";
pub const STEP_CANCEL_PAYMENT: &str = "cancel payment";

pub const STEP_LIST_CARS: &str = "list cars";
pub const STEP_LIST_USER_RENTALS: &str = "list user rentals";
pub const STEP_GET_CAR_INFO: &str = "get car info";
pub const STEP_GET_PAYMENT_INFO: &str = "get payment info";
