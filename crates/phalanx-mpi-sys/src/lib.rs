#![allow(dead_code, non_camel_case_types, non_snake_case, non_upper_case_globals)]

use std::marker::{PhantomData, PhantomPinned};

// We represent opaque C types as structs with a particular structure that is following the convention
// suggested in [the Rustonomicon](https://doc.rust-lang.org/nomicon/ffi.html#representing-opaque-structs).
#[repr(C)]
pub struct ompi_op_t {
    _data: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

/// Handle that represents a predefined reduction operation of the collective-communication runtime. Predefined
/// operation handles are addresses of global objects exported by the runtime's shared library; they are resolved
/// once at load time and forwarded verbatim, never dereferenced.
pub type MPI_Op = *mut ompi_op_t;

// We represent opaque C types as structs with a particular structure that is following the convention
// suggested in [the Rustonomicon](https://doc.rust-lang.org/nomicon/ffi.html#representing-opaque-structs).
#[repr(C)]
pub struct ompi_datatype_t {
    _data: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

/// Handle that represents a predefined element type of the collective-communication runtime. Like [`MPI_Op`],
/// predefined datatype handles are addresses of global objects exported by the runtime's shared library.
pub type MPI_Datatype = *mut ompi_datatype_t;

/// Shared-library names that are probed, in order, when discovering the collective-communication runtime without
/// an explicit path. The `.so.40` name covers Open MPI 4.x/5.x installations whose development symlink is absent.
pub const DEFAULT_LIBRARY_NAMES: &[&str] = &["libmpi.so", "libmpi.so.40", "libmpi.so.12", "libmpi.dylib"];

/// Names under which the runtime exports its predefined reduction-operation and datatype handles, following the
/// Open MPI convention (`MPI_SUM` is the address of the exported global `ompi_mpi_op_sum`, and so on).
pub mod symbols {
    /// Exported global for the `MPI_SUM` reduction operation.
    pub const OP_SUM: &[u8] = b"ompi_mpi_op_sum";

    /// Exported global for the `MPI_PROD` reduction operation.
    pub const OP_PROD: &[u8] = b"ompi_mpi_op_prod";

    /// Exported global for the `MPI_MAX` reduction operation.
    pub const OP_MAX: &[u8] = b"ompi_mpi_op_max";

    /// Exported global for the `MPI_MIN` reduction operation.
    pub const OP_MIN: &[u8] = b"ompi_mpi_op_min";

    /// Exported global for the `MPI_C_BOOL` datatype.
    pub const TYPE_C_BOOL: &[u8] = b"ompi_mpi_c_bool";

    /// Exported global for the `MPI_INT8_T` datatype.
    pub const TYPE_INT8: &[u8] = b"ompi_mpi_int8_t";

    /// Exported global for the `MPI_INT16_T` datatype.
    pub const TYPE_INT16: &[u8] = b"ompi_mpi_int16_t";

    /// Exported global for the `MPI_INT32_T` datatype.
    pub const TYPE_INT32: &[u8] = b"ompi_mpi_int32_t";

    /// Exported global for the `MPI_INT64_T` datatype.
    pub const TYPE_INT64: &[u8] = b"ompi_mpi_int64_t";

    /// Exported global for the `MPI_UINT8_T` datatype.
    pub const TYPE_UINT8: &[u8] = b"ompi_mpi_uint8_t";

    /// Exported global for the `MPI_UINT16_T` datatype.
    pub const TYPE_UINT16: &[u8] = b"ompi_mpi_uint16_t";

    /// Exported global for the `MPI_UINT32_T` datatype.
    pub const TYPE_UINT32: &[u8] = b"ompi_mpi_uint32_t";

    /// Exported global for the `MPI_UINT64_T` datatype.
    pub const TYPE_UINT64: &[u8] = b"ompi_mpi_uint64_t";

    /// Exported global for the `MPI_FLOAT` datatype.
    pub const TYPE_FLOAT: &[u8] = b"ompi_mpi_float";

    /// Exported global for the `MPI_DOUBLE` datatype.
    pub const TYPE_DOUBLE: &[u8] = b"ompi_mpi_double";

    /// Exported global for the `MPI_C_FLOAT_COMPLEX` datatype.
    pub const TYPE_C_FLOAT_COMPLEX: &[u8] = b"ompi_mpi_c_float_complex";

    /// Exported global for the `MPI_C_DOUBLE_COMPLEX` datatype.
    pub const TYPE_C_DOUBLE_COMPLEX: &[u8] = b"ompi_mpi_c_double_complex";
}
