use thiserror::Error;

/// Host-side failure codes, aligned with the host ABI.
///
/// Codes are stable wire values: an embedding maps them to/from its own
/// error channel with [`HostError::code`] and [`HostError::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("invalid input")]
    InvalidInput,
    #[error("forbidden")]
    Forbidden,
    #[error("out of gas")]
    OutOfGas,
    #[error("host internal error")]
    Internal,
}

impl HostError {
    pub fn code(self) -> u32 {
        match self {
            HostError::InvalidInput => 1,
            HostError::Forbidden => 2,
            HostError::OutOfGas => 3,
            HostError::Internal => 4,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(HostError::InvalidInput),
            2 => Some(HostError::Forbidden),
            3 => Some(HostError::OutOfGas),
            4 => Some(HostError::Internal),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HostError::InvalidInput => "invalid_input",
            HostError::Forbidden => "forbidden",
            HostError::OutOfGas => "out_of_gas",
            HostError::Internal => "internal",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "invalid_input" => Some(HostError::InvalidInput),
            "forbidden" => Some(HostError::Forbidden),
            "out_of_gas" => Some(HostError::OutOfGas),
            "internal" => Some(HostError::Internal),
            _ => None,
        }
    }
}
