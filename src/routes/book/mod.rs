mod handler;
mod model;
mod upload;

pub use handler::{
    create_book, delete_book, filter_books, get_all_books, get_book_by_id, get_book_by_secret,
    mark_book_sold, report_book, search_books, update_book,
};
pub use upload::MAX_IMAGE_BYTES;
