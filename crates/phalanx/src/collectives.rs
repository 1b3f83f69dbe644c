use std::ffi::c_void;
use std::path::Path;

use libloading::Library;
use tracing::debug;

use phalanx_mpi_sys as ffi;

use crate::{ElementType, Error, ReduceOp};

/// Opaque reduction-operation handle belonging to the collective-communication runtime. A [`NativeReduceOp`] is
/// only ever forwarded back to the runtime (e.g., as the operation argument of an all-reduce); its value is never
/// interpreted by this crate. It remains valid for as long as the [`CollectiveRuntime`] that produced it is alive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NativeReduceOp(ffi::MPI_Op);

impl NativeReduceOp {
    /// Returns the [`MPI_Op`](ffi::MPI_Op) that corresponds to this [`NativeReduceOp`] and which can be passed to
    /// functions of the collective-communication runtime.
    pub unsafe fn to_c_api(&self) -> ffi::MPI_Op {
        self.0
    }
}

unsafe impl Send for NativeReduceOp {}
unsafe impl Sync for NativeReduceOp {}

/// Opaque element-type handle belonging to the collective-communication runtime. Like [`NativeReduceOp`], it is a
/// pure forwarding value that remains valid for as long as the [`CollectiveRuntime`] that produced it is alive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NativeElementType(ffi::MPI_Datatype);

impl NativeElementType {
    /// Returns the [`MPI_Datatype`](ffi::MPI_Datatype) that corresponds to this [`NativeElementType`] and which can
    /// be passed to functions of the collective-communication runtime.
    pub unsafe fn to_c_api(&self) -> ffi::MPI_Datatype {
        self.0
    }
}

unsafe impl Send for NativeElementType {}
unsafe impl Sync for NativeElementType {}

/// Predefined reduction-operation and datatype handles resolved from the runtime's shared library. The table is
/// exhaustive over [`ReduceOp`] and [`ElementType`]; a missing symbol fails the whole resolution, so a constructed
/// table can always translate every canonical value.
struct SymbolTable {
    op_sum: ffi::MPI_Op,
    op_prod: ffi::MPI_Op,
    op_max: ffi::MPI_Op,
    op_min: ffi::MPI_Op,
    boolean: ffi::MPI_Datatype,
    int8: ffi::MPI_Datatype,
    int16: ffi::MPI_Datatype,
    int32: ffi::MPI_Datatype,
    int64: ffi::MPI_Datatype,
    uint8: ffi::MPI_Datatype,
    uint16: ffi::MPI_Datatype,
    uint32: ffi::MPI_Datatype,
    uint64: ffi::MPI_Datatype,
    float32: ffi::MPI_Datatype,
    float64: ffi::MPI_Datatype,
    complex64: ffi::MPI_Datatype,
    complex128: ffi::MPI_Datatype,
}

impl SymbolTable {
    /// Resolves all predefined handles from the provided [`Library`].
    unsafe fn resolve(library: &Library) -> Result<Self, Error> {
        unsafe {
            Ok(Self {
                op_sum: data_symbol(library, ffi::symbols::OP_SUM)?,
                op_prod: data_symbol(library, ffi::symbols::OP_PROD)?,
                op_max: data_symbol(library, ffi::symbols::OP_MAX)?,
                op_min: data_symbol(library, ffi::symbols::OP_MIN)?,
                boolean: data_symbol(library, ffi::symbols::TYPE_C_BOOL)?,
                int8: data_symbol(library, ffi::symbols::TYPE_INT8)?,
                int16: data_symbol(library, ffi::symbols::TYPE_INT16)?,
                int32: data_symbol(library, ffi::symbols::TYPE_INT32)?,
                int64: data_symbol(library, ffi::symbols::TYPE_INT64)?,
                uint8: data_symbol(library, ffi::symbols::TYPE_UINT8)?,
                uint16: data_symbol(library, ffi::symbols::TYPE_UINT16)?,
                uint32: data_symbol(library, ffi::symbols::TYPE_UINT32)?,
                uint64: data_symbol(library, ffi::symbols::TYPE_UINT64)?,
                float32: data_symbol(library, ffi::symbols::TYPE_FLOAT)?,
                float64: data_symbol(library, ffi::symbols::TYPE_DOUBLE)?,
                complex64: data_symbol(library, ffi::symbols::TYPE_C_FLOAT_COMPLEX)?,
                complex128: data_symbol(library, ffi::symbols::TYPE_C_DOUBLE_COMPLEX)?,
            })
        }
    }

    /// Returns the predefined handle for the provided [`ReduceOp`].
    fn reduce_op(&self, op: ReduceOp) -> ffi::MPI_Op {
        match op {
            ReduceOp::Sum => self.op_sum,
            ReduceOp::Product => self.op_prod,
            ReduceOp::Max => self.op_max,
            ReduceOp::Min => self.op_min,
        }
    }

    /// Returns the predefined handle for the provided [`ElementType`].
    fn element_type(&self, element_type: ElementType) -> ffi::MPI_Datatype {
        match element_type {
            ElementType::Boolean => self.boolean,
            ElementType::Int8 => self.int8,
            ElementType::Int16 => self.int16,
            ElementType::Int32 => self.int32,
            ElementType::Int64 => self.int64,
            ElementType::UnsignedInt8 => self.uint8,
            ElementType::UnsignedInt16 => self.uint16,
            ElementType::UnsignedInt32 => self.uint32,
            ElementType::UnsignedInt64 => self.uint64,
            ElementType::Float32 => self.float32,
            ElementType::Float64 => self.float64,
            ElementType::Complex64 => self.complex64,
            ElementType::Complex128 => self.complex128,
        }
    }
}

/// Returns the address of the exported data symbol named `name` in `library`, cast to the requested handle type.
/// The address itself is the predefined handle; nothing is ever read through it.
unsafe fn data_symbol<T>(library: &Library, name: &[u8]) -> Result<*mut T, Error> {
    let symbol = unsafe { library.get::<*mut c_void>(name) }.map_err(|error| {
        Error::runtime_unavailable(format!(
            "failed to resolve the '{}' symbol of the collective communication runtime; {error}",
            String::from_utf8_lossy(name),
        ))
    })?;
    Ok((*symbol).cast())
}

/// State of a [`CollectiveRuntime`]: either a loaded runtime with its resolved [`SymbolTable`], or the
/// dependency-absent state with the reason the runtime could not be made available.
enum State {
    /// The shared [`Library`] is kept alive here because the resolved handles point into it. It is `None` only for
    /// runtimes constructed around a fabricated table in tests.
    Available { library: Option<Library>, table: SymbolTable },
    Unavailable { reason: String },
}

/// Translation boundary to the collective-communication runtime. A [`CollectiveRuntime`] is initialized exactly
/// once, in one of two phases of availability:
///
///   - [`CollectiveRuntime::load`] / [`CollectiveRuntime::initialize`] produce a runtime whose predefined handle
///     tables were fully resolved from the runtime's shared library, and
///   - [`CollectiveRuntime::unavailable`] produces a runtime in the dependency-absent state, in which every
///     translation request fails with [`Error::RuntimeUnavailable`].
///
/// The dependency-absent state takes precedence over value errors: translating an invalid name through an
/// unavailable runtime reports the missing runtime, never a lookup miss.
pub struct CollectiveRuntime {
    state: State,
}

impl CollectiveRuntime {
    /// Loads the collective-communication runtime from the shared library at `library_path` and resolves all of its
    /// predefined reduction-operation and datatype handles. Any failure, from the library load to a single missing
    /// symbol, fails the whole load with [`Error::RuntimeUnavailable`].
    pub fn load<P: AsRef<Path>>(library_path: P) -> Result<Self, Error> {
        let library_path = library_path.as_ref();
        let library = unsafe { Library::new(library_path) }.map_err(|error| {
            Error::runtime_unavailable(format!(
                "failed to load the collective communication runtime from '{}'; {error}",
                library_path.display(),
            ))
        })?;
        let table = unsafe { SymbolTable::resolve(&library) }?;
        debug!("loaded the collective communication runtime from '{}'", library_path.display());
        Ok(Self { state: State::Available { library: Some(library), table } })
    }

    /// Initializes a [`CollectiveRuntime`] by probing the default shared-library names of the
    /// collective-communication runtime, in order. If none of them can be loaded, the returned runtime is in the
    /// dependency-absent state rather than this function returning an error, so that the absent-runtime path is an
    /// ordinary value that callers (and tests) can hold on to.
    pub fn initialize() -> Self {
        let mut failures = Vec::with_capacity(ffi::DEFAULT_LIBRARY_NAMES.len());
        for name in ffi::DEFAULT_LIBRARY_NAMES {
            match Self::load(name) {
                Ok(runtime) => return runtime,
                Err(error) => failures.push(format!("'{name}': {error}")),
            }
        }
        Self::unavailable(format!("no collective communication runtime could be loaded ({})", failures.join("; ")))
    }

    /// Creates a [`CollectiveRuntime`] in the dependency-absent state. Every translation request made through the
    /// returned runtime fails with [`Error::RuntimeUnavailable`] carrying the provided `reason`.
    pub fn unavailable<M: Into<String>>(reason: M) -> Self {
        Self { state: State::Unavailable { reason: reason.into() } }
    }

    /// Creates a [`CollectiveRuntime`] around a fabricated [`SymbolTable`] so that translation can be exercised
    /// without a loaded runtime. The fabricated handles must never be forwarded to a real runtime.
    #[cfg(test)]
    fn with_table(table: SymbolTable) -> Self {
        Self { state: State::Available { library: None, table } }
    }

    /// Returns `true` if the collective-communication runtime was loaded and translation requests can succeed.
    pub fn is_available(&self) -> bool {
        matches!(self.state, State::Available { .. })
    }

    /// Returns the resolved [`SymbolTable`], or [`Error::RuntimeUnavailable`] in the dependency-absent state.
    fn table(&self) -> Result<&SymbolTable, Error> {
        match &self.state {
            State::Available { table, .. } => Ok(table),
            State::Unavailable { reason } => Err(Error::runtime_unavailable(reason.clone())),
        }
    }

    /// Translates a reduction-operation name into the runtime's predefined handle. The name is parsed with
    /// [`ReduceOp::from_str`] (case-insensitive, all aliases recognized) after the availability check, so an
    /// unavailable runtime is reported for invalid names too.
    pub fn reduce_op<S: AsRef<str>>(&self, name: S) -> Result<NativeReduceOp, Error> {
        let table = self.table()?;
        Ok(NativeReduceOp(table.reduce_op(ReduceOp::from_str(name)?)))
    }

    /// Translates a [`ReduceOp`] into the runtime's predefined handle. Only [`Error::RuntimeUnavailable`] is
    /// possible here since the canonical vocabulary is covered exhaustively.
    pub fn native_reduce_op(&self, op: ReduceOp) -> Result<NativeReduceOp, Error> {
        Ok(NativeReduceOp(self.table()?.reduce_op(op)))
    }

    /// Translates an element-type descriptor into the runtime's predefined handle. The descriptor is normalized
    /// with [`ElementType::from_str`] after the availability check, so an unavailable runtime is reported for
    /// invalid descriptors too.
    pub fn element_type<S: AsRef<str>>(&self, descriptor: S) -> Result<NativeElementType, Error> {
        let table = self.table()?;
        Ok(NativeElementType(table.element_type(ElementType::from_str(descriptor)?)))
    }

    /// Translates an [`ElementType`] into the runtime's predefined handle. Only [`Error::RuntimeUnavailable`] is
    /// possible here since the canonical vocabulary is covered exhaustively.
    pub fn native_element_type(&self, element_type: ElementType) -> Result<NativeElementType, Error> {
        Ok(NativeElementType(self.table()?.element_type(element_type)))
    }
}

unsafe impl Send for CollectiveRuntime {}
unsafe impl Sync for CollectiveRuntime {}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use phalanx_mpi_sys as ffi;

    use crate::{CollectiveRuntime, ElementType, Error, ReduceOp};

    use super::SymbolTable;

    /// Returns a [`CollectiveRuntime`] around fabricated, never-dereferenced handle addresses.
    fn test_runtime() -> CollectiveRuntime {
        CollectiveRuntime::with_table(SymbolTable {
            op_sum: 0x10 as ffi::MPI_Op,
            op_prod: 0x11 as ffi::MPI_Op,
            op_max: 0x12 as ffi::MPI_Op,
            op_min: 0x13 as ffi::MPI_Op,
            boolean: 0x20 as ffi::MPI_Datatype,
            int8: 0x21 as ffi::MPI_Datatype,
            int16: 0x22 as ffi::MPI_Datatype,
            int32: 0x23 as ffi::MPI_Datatype,
            int64: 0x24 as ffi::MPI_Datatype,
            uint8: 0x25 as ffi::MPI_Datatype,
            uint16: 0x26 as ffi::MPI_Datatype,
            uint32: 0x27 as ffi::MPI_Datatype,
            uint64: 0x28 as ffi::MPI_Datatype,
            float32: 0x29 as ffi::MPI_Datatype,
            float64: 0x2a as ffi::MPI_Datatype,
            complex64: 0x2b as ffi::MPI_Datatype,
            complex128: 0x2c as ffi::MPI_Datatype,
        })
    }

    #[test]
    fn test_reduce_op_alias_groups() {
        let runtime = test_runtime();
        for aliases in [
            &["+", "sum", "add", "SUM"][..],
            &["*", "prod", "product", "Product"][..],
            &["max", "maximum", "MAX"][..],
            &["min", "minimum", "MINIMUM"][..],
        ] {
            let expected = runtime.reduce_op(aliases[0]).unwrap();
            for alias in aliases {
                assert_eq!(runtime.reduce_op(alias).unwrap(), expected);
            }
        }

        // The four groups translate to four distinct native symbols.
        let symbols: HashSet<_> = ["sum", "product", "max", "min"]
            .iter()
            .map(|name| runtime.reduce_op(name).unwrap())
            .collect();
        assert_eq!(symbols.len(), 4);
    }

    #[test]
    fn test_reduce_op_matches_typed_lookup() {
        let runtime = test_runtime();
        for (name, op) in
            [("+", ReduceOp::Sum), ("*", ReduceOp::Product), ("max", ReduceOp::Max), ("min", ReduceOp::Min)]
        {
            assert_eq!(runtime.reduce_op(name).unwrap(), runtime.native_reduce_op(op).unwrap());
        }
    }

    #[test]
    fn test_reduce_op_unknown() {
        let runtime = test_runtime();
        assert!(matches!(
            runtime.reduce_op("xor"),
            Err(Error::UnrecognizedValue { value, .. }) if value == "xor",
        ));
    }

    #[test]
    fn test_element_type_descriptors() {
        let runtime = test_runtime();

        // Every recognized descriptor translates to a stable, distinct native symbol.
        let symbols: HashSet<_> = ElementType::all()
            .iter()
            .map(|element_type| runtime.native_element_type(*element_type).unwrap())
            .collect();
        assert_eq!(symbols.len(), ElementType::all().len());

        for element_type in ElementType::all() {
            assert_eq!(
                runtime.element_type(element_type.to_string()).unwrap(),
                runtime.native_element_type(element_type).unwrap(),
            );
        }

        assert!(matches!(
            runtime.element_type("float16"),
            Err(Error::UnrecognizedValue { value, .. }) if value == "float16",
        ));
    }

    #[test]
    fn test_unavailable_runtime() {
        let runtime = CollectiveRuntime::unavailable("mpi is not installed");
        assert!(!runtime.is_available());

        // The configuration error takes precedence over value errors, for valid and invalid inputs alike.
        for name in ["sum", "xor"] {
            assert!(matches!(runtime.reduce_op(name), Err(Error::RuntimeUnavailable { .. })));
        }
        for descriptor in ["float32", "float16", "not-a-type"] {
            assert!(matches!(runtime.element_type(descriptor), Err(Error::RuntimeUnavailable { .. })));
        }
        assert!(matches!(runtime.native_reduce_op(ReduceOp::Sum), Err(Error::RuntimeUnavailable { .. })));
        assert!(matches!(
            runtime.native_element_type(ElementType::Float64),
            Err(Error::RuntimeUnavailable { message, .. }) if message.contains("mpi is not installed"),
        ));
    }

    #[test]
    fn test_load_missing_library() {
        assert!(matches!(
            CollectiveRuntime::load("/nonexistent/libphalanx-missing-mpi.so"),
            Err(Error::RuntimeUnavailable { .. }),
        ));
    }

    #[test]
    fn test_initialize() {
        // Initialization must produce a usable runtime in either phase: loaded, or first-class unavailable.
        let runtime = CollectiveRuntime::initialize();
        if runtime.is_available() {
            assert!(runtime.reduce_op("sum").is_ok());
            assert!(runtime.element_type("float32").is_ok());
        } else {
            assert!(matches!(runtime.reduce_op("sum"), Err(Error::RuntimeUnavailable { .. })));
        }
    }
}
