//! Geometry attribute buffers and the copy / no-copy assembly rule.

use std::borrow::Cow;

use super::AttributeDescriptor;
use crate::bfast::NamedBuffer;
use crate::util::{AssemblyError, VimPod};

/// Default single-buffer size from which assembly hands out views instead of copies.
pub const DEFAULT_MIN_ZERO_COPY_BYTES: usize = 8 * 1024 * 1024;

/// A container buffer together with its parsed descriptor.
#[derive(Clone, Debug)]
pub struct GeometryAttribute {
    descriptor: AttributeDescriptor,
    buffer: NamedBuffer,
}

impl GeometryAttribute {
    /// Parse the buffer's name and check its length against the descriptor.
    pub fn from_buffer(buffer: NamedBuffer) -> Result<Self, AssemblyError> {
        let descriptor = AttributeDescriptor::parse(buffer.name())?;
        Self::new(descriptor, buffer)
    }

    /// Pair a descriptor with a buffer, checking the size invariant.
    pub fn new(descriptor: AttributeDescriptor, buffer: NamedBuffer) -> Result<Self, AssemblyError> {
        descriptor.validate_len(buffer.name(), buffer.len())?;
        Ok(Self { descriptor, buffer })
    }

    #[inline]
    pub fn descriptor(&self) -> &AttributeDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn buffer(&self) -> &NamedBuffer {
        &self.buffer
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.buffer.len()
    }

    /// Number of scalar values (`byte_len / scalar size`).
    #[inline]
    pub fn element_count(&self) -> usize {
        self.buffer.len() / self.descriptor.data_type.scalar.num_bytes()
    }

    /// Number of whole elements (`byte_len / (scalar size * arity)`).
    #[inline]
    pub fn tuple_count(&self) -> usize {
        self.buffer.len() / self.descriptor.data_type.num_bytes()
    }
}

enum Storage {
    /// Zero-copy view into the container arena
    View(NamedBuffer),
    /// Owned copy; backed by u64 words so every scalar view is aligned
    Owned { words: Vec<u64>, len: usize },
}

/// Read-only attribute data ready for a renderer.
pub struct AttributeBuffer {
    descriptor: AttributeDescriptor,
    storage: Storage,
}

impl AttributeBuffer {
    fn view(descriptor: AttributeDescriptor, buffer: NamedBuffer) -> Self {
        Self { descriptor, storage: Storage::View(buffer) }
    }

    fn copied<'a>(descriptor: AttributeDescriptor, parts: impl Iterator<Item = &'a [u8]> + Clone) -> Self {
        let len: usize = parts.clone().map(<[u8]>::len).sum();
        let mut words = vec![0u64; len.div_ceil(8)];
        let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
        let mut pos = 0;
        for part in parts {
            dst[pos..pos + part.len()].copy_from_slice(part);
            pos += part.len();
        }
        Self { descriptor, storage: Storage::Owned { words, len } }
    }

    /// Descriptor of the (first) attribute this buffer was built from.
    #[inline]
    pub fn descriptor(&self) -> &AttributeDescriptor {
        &self.descriptor
    }

    /// True if this buffer borrows the container arena.
    #[inline]
    pub fn is_zero_copy(&self) -> bool {
        matches!(self.storage, Storage::View(_))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::View(buffer) => buffer.bytes(),
            Storage::Owned { words, len } => &bytemuck::cast_slice(words)[..*len],
        }
    }

    /// Length in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        match &self.storage {
            Storage::View(buffer) => buffer.len(),
            Storage::Owned { len, .. } => *len,
        }
    }

    /// Number of `T` values the buffer holds.
    #[inline]
    pub fn element_count<T: VimPod>(&self) -> usize {
        self.byte_len() / T::SIZE
    }

    /// Typed view of the data. `T` must match the stored scalar type.
    ///
    /// Borrowed when the bytes are suitably aligned for `T` (always for
    /// copies, usually for views since containers pad their data); copied
    /// otherwise. A trailing partial element is ignored.
    pub fn typed<T: VimPod>(&self) -> Result<Cow<'_, [T]>, AssemblyError> {
        let stored = self.descriptor.data_type.scalar;
        if stored != T::SCALAR {
            return Err(AssemblyError::ScalarMismatch {
                name: self.descriptor.to_string(),
                stored,
                requested: T::SCALAR,
            });
        }
        let bytes = self.as_bytes();
        let bytes = &bytes[..bytes.len() - bytes.len() % T::SIZE];
        Ok(match bytemuck::try_cast_slice(bytes) {
            Ok(slice) => Cow::Borrowed(slice),
            Err(_) => Cow::Owned(bytemuck::pod_collect_to_vec(bytes)),
        })
    }
}

impl std::fmt::Debug for AttributeBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeBuffer")
            .field("descriptor", &self.descriptor.to_string())
            .field("bytes", &self.byte_len())
            .field("zero_copy", &self.is_zero_copy())
            .finish()
    }
}

/// Build one logical buffer from a sequence of attributes.
///
/// - no attributes: `Ok(None)`;
/// - several: always one contiguous copy, concatenated in sequence order;
/// - one: a zero-copy view when `byte_len >= min_zero_copy_bytes`, a copy otherwise.
pub fn assemble(
    attributes: &[GeometryAttribute],
    min_zero_copy_bytes: usize,
) -> Result<Option<AttributeBuffer>, AssemblyError> {
    let Some(first) = attributes.first() else {
        return Ok(None);
    };

    for attr in attributes {
        attr.descriptor.validate_len(attr.buffer.name(), attr.byte_len())?;
        if attr.descriptor.data_type != first.descriptor.data_type {
            return Err(AssemblyError::MismatchedDescriptor {
                name: attr.buffer.name().to_string(),
                expected: first.descriptor.data_type,
                found: attr.descriptor.data_type,
            });
        }
    }

    let descriptor = first.descriptor.clone();
    if let [single] = attributes {
        if single.byte_len() >= min_zero_copy_bytes {
            tracing::trace!(attribute = %descriptor, bytes = single.byte_len(), "zero-copy view");
            return Ok(Some(AttributeBuffer::view(descriptor, single.buffer.clone())));
        }
    }

    tracing::trace!(attribute = %descriptor, parts = attributes.len(), "copying attribute");
    Ok(Some(AttributeBuffer::copied(
        descriptor,
        attributes.iter().map(|a| a.buffer.bytes()),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bfast::test_util::ContainerBuilder;
    use crate::bfast::{Container, SourceBytes};
    use std::sync::Arc;

    fn container(entries: &[(&str, Vec<u8>)]) -> Container {
        let mut builder = ContainerBuilder::new();
        for (name, data) in entries {
            builder = builder.add(name, data);
        }
        Container::decode(Arc::new(SourceBytes::from_vec(builder.build()))).unwrap()
    }

    fn attr(c: &Container, name: &str) -> GeometryAttribute {
        GeometryAttribute::from_buffer(c.get(name).unwrap().clone()).unwrap()
    }

    fn floats(values: &[f32]) -> Vec<u8> {
        bytemuck::cast_slice(values).to_vec()
    }

    #[test]
    fn test_empty_is_none() {
        assert!(assemble(&[], 0).unwrap().is_none());
    }

    #[test]
    fn test_single_threshold_boundary() {
        let c = container(&[("vertex:position:0:float32:3", floats(&[0.0; 12]))]);
        let a = attr(&c, "vertex:position:0:float32:3");
        assert_eq!(a.byte_len(), 48);

        let at = assemble(std::slice::from_ref(&a), 48).unwrap().unwrap();
        assert!(at.is_zero_copy());
        assert_eq!(at.as_bytes().as_ptr(), a.buffer().bytes().as_ptr());

        let below = assemble(std::slice::from_ref(&a), 49).unwrap().unwrap();
        assert!(!below.is_zero_copy());
        assert_eq!(below.as_bytes(), a.buffer().bytes());
    }

    #[test]
    fn test_many_always_copies_in_order() {
        let c = container(&[
            ("vertex:position:0:float32:3", floats(&[1.0, 2.0, 3.0])),
            ("vertex:position:1:float32:3", floats(&[4.0, 5.0, 6.0, 7.0, 8.0, 9.0])),
        ]);
        let parts = [
            attr(&c, "vertex:position:0:float32:3"),
            attr(&c, "vertex:position:1:float32:3"),
        ];
        let buf = assemble(&parts, 0).unwrap().unwrap();
        assert!(!buf.is_zero_copy());
        assert_eq!(buf.byte_len(), 36);
        assert_eq!(buf.element_count::<f32>(), 9);
        assert_eq!(&*buf.typed::<f32>().unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert!(matches!(buf.typed::<f32>().unwrap(), Cow::Borrowed(_)));
        match buf.typed::<f64>() {
            Err(AssemblyError::ScalarMismatch { stored, requested, .. }) => {
                assert_eq!(stored, crate::util::ScalarType::Float32);
                assert_eq!(requested, crate::util::ScalarType::Float64);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(buf.typed::<u32>().is_err());
    }

    #[test]
    fn test_inconsistent_size() {
        let c = container(&[("vertex:position:0:float32:3", vec![0u8; 20])]);
        let err = GeometryAttribute::from_buffer(c.get("vertex:position:0:float32:3").unwrap().clone());
        assert!(matches!(err, Err(AssemblyError::InconsistentAttributeSize { .. })));
    }

    #[test]
    fn test_mismatched_parts() {
        let c = container(&[
            ("vertex:position:0:float32:3", floats(&[0.0; 3])),
            ("vertex:position:1:float64:3", vec![0u8; 24]),
        ]);
        let parts = [
            attr(&c, "vertex:position:0:float32:3"),
            attr(&c, "vertex:position:1:float64:3"),
        ];
        assert!(matches!(
            assemble(&parts, 0),
            Err(AssemblyError::MismatchedDescriptor { .. })
        ));
    }

    #[test]
    fn test_counts() {
        let c = container(&[("corner:index:0:int32:1", vec![0u8; 24])]);
        let a = attr(&c, "corner:index:0:int32:1");
        assert_eq!(a.element_count(), 6);
        assert_eq!(a.tuple_count(), 6);

        let c = container(&[("vertex:position:0:float32:3", floats(&[0.0; 6]))]);
        let a = attr(&c, "vertex:position:0:float32:3");
        assert_eq!(a.element_count(), 6);
        assert_eq!(a.tuple_count(), 2);
    }
}
