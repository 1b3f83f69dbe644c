use std::fmt::Display;

use crate::Error;

/// Canonical collective reduction operation. This is the closed vocabulary that callers use to request reductions;
/// [`CollectiveRuntime::native_reduce_op`](crate::CollectiveRuntime::native_reduce_op) translates it into the
/// corresponding predefined handle of the collective-communication runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReduceOp {
    /// Element-wise sum across the cooperating processes.
    Sum,

    /// Element-wise product across the cooperating processes.
    Product,

    /// Element-wise maximum across the cooperating processes.
    Max,

    /// Element-wise minimum across the cooperating processes.
    Min,
}

impl ReduceOp {
    /// Parses a reduction-operation name into a [`ReduceOp`]. The lookup is case-insensitive and each operation is
    /// recognized under all of its aliases (e.g., `"+"`, `"sum"`, and `"add"` all parse to [`ReduceOp::Sum`]).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str<S: AsRef<str>>(value: S) -> Result<Self, Error> {
        let value = value.as_ref();
        match value.trim().to_ascii_lowercase().as_str() {
            "+" | "sum" | "add" => Ok(Self::Sum),
            "*" | "prod" | "product" => Ok(Self::Product),
            "max" | "maximum" => Ok(Self::Max),
            "min" | "minimum" => Ok(Self::Min),
            _ => Err(Error::unrecognized_value(value, format!("invalid collective reduce operation: {value}"))),
        }
    }
}

impl Display for ReduceOp {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            Self::Sum => "sum",
            Self::Product => "product",
            Self::Max => "max",
            Self::Min => "min",
        })
    }
}
