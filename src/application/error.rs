#[derive(Debug)]
pub enum ApplicationError {
    NotFound,
    InternalError(String),
}
