#[derive(Debug)]
pub struct Error(Repr);

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // a declared binding was missing or written twice
    BadBinding,
    // a compute unit broke the clause contract
    BadEval,
    Internal,
    Custom
}

impl Error {
    pub fn new<E>(error: E) -> Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error(Repr::Custom(ErrorKind::Custom, error.into()))
    }

    pub fn with_kind<E>(kind: ErrorKind, error: E) -> Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error(Repr::Custom(kind, error.into()))
    }

    pub fn kind(&self) -> ErrorKind {
        match &self.0 {
            Repr::Custom(c, _) => c.clone(),
            Repr::Simple(c) => c.clone(),
            Repr::SimpleMessage(c, _) => c.clone()
        }
    }

    pub fn new_const(kind : ErrorKind, message: &'static str) -> Self {
        Error(Repr::SimpleMessage(kind, message))
    }
}

impl From<ErrorKind> for Error {
    fn from(e: ErrorKind) -> Self {
        Error(Repr::Simple(e))
    }
}

#[derive(Debug)]
enum Repr {
    Simple(ErrorKind),
    SimpleMessage(ErrorKind, &'static str),
    Custom(ErrorKind, Box<dyn std::error::Error + Send>)
}
