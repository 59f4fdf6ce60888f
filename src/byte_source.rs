//! Input byte sources.
//!
//! A [`ByteSource`] is either a filesystem path or a caller-owned byte
//! buffer. Buffers are presented to FFmpeg through a custom I/O context
//! ([`BufferIo`]) whose read and seek callbacks walk a cursor over the
//! caller's memory; the bytes are never copied and must outlive the
//! decoder (the borrow checker enforces this through the decoder's
//! lifetime parameter).

use std::ffi::c_void;
use std::os::raw::c_int;
use std::path::{Path, PathBuf};

use ffmpeg_sys_next as ffi;

use crate::error::DecodeError;

/// Default size of the scratch buffer FFmpeg reads through, in bytes.
pub const DEFAULT_SCRATCH_CAPACITY: usize = 1024 * 1024;

/// Where the container bytes come from.
#[derive(Debug, Clone)]
pub enum ByteSource<'a> {
    /// A seekable file on disk.
    File(PathBuf),
    /// A complete container held in memory by the caller.
    Buffer(&'a [u8]),
}

impl From<PathBuf> for ByteSource<'static> {
    fn from(path: PathBuf) -> Self {
        ByteSource::File(path)
    }
}

impl From<&Path> for ByteSource<'static> {
    fn from(path: &Path) -> Self {
        ByteSource::File(path.to_path_buf())
    }
}

impl<'a> From<&'a [u8]> for ByteSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        ByteSource::Buffer(bytes)
    }
}

/// Read cursor over the caller's buffer, shared with the FFmpeg callbacks
/// through the I/O context's opaque pointer.
struct BufferCursor {
    data: *const u8,
    len: usize,
    pos: usize,
}

/// An FFmpeg I/O context backed by a borrowed byte buffer.
///
/// Owns the `AVIOContext` and its scratch buffer; both are released on
/// drop. Must be dropped after the format context that reads through it.
pub(crate) struct BufferIo {
    avio: *mut ffi::AVIOContext,
    // Boxed so the opaque pointer handed to FFmpeg stays stable; only the
    // callbacks touch it after construction.
    _cursor: Box<BufferCursor>,
}

impl BufferIo {
    /// Wrap `bytes` in an I/O context with the given scratch capacity.
    pub(crate) fn new(bytes: &[u8], scratch_capacity: usize) -> Result<Self, DecodeError> {
        let mut cursor = Box::new(BufferCursor {
            data: bytes.as_ptr(),
            len: bytes.len(),
            pos: 0,
        });

        // SAFETY: the scratch buffer is allocated with av_malloc because
        // FFmpeg may reallocate it internally; ownership stays with this
        // struct, which frees it in Drop. The opaque pointer is valid for
        // the lifetime of the AVIOContext because the cursor box is stored
        // alongside it.
        unsafe {
            let scratch = ffi::av_malloc(scratch_capacity) as *mut u8;
            if scratch.is_null() {
                return Err(DecodeError::Io(format!(
                    "Failed to allocate {scratch_capacity}-byte I/O buffer"
                )));
            }
            let avio = ffi::avio_alloc_context(
                scratch,
                scratch_capacity as c_int,
                0,
                (&mut *cursor as *mut BufferCursor).cast::<c_void>(),
                Some(read_bytes),
                None,
                Some(seek_bytes),
            );
            if avio.is_null() {
                ffi::av_free(scratch.cast::<c_void>());
                return Err(DecodeError::Io("Failed to allocate AVIOContext".to_string()));
            }
            Ok(Self {
                avio,
                _cursor: cursor,
            })
        }
    }

    pub(crate) fn as_mut_ptr(&self) -> *mut ffi::AVIOContext {
        self.avio
    }
}

impl Drop for BufferIo {
    fn drop(&mut self) {
        // SAFETY: both pointers were allocated in `new` and are released
        // exactly once here. FFmpeg does not free a caller-supplied pb on
        // avformat_close_input, so this is the only release site.
        unsafe {
            if !self.avio.is_null() {
                ffi::av_freep((&mut (*self.avio).buffer as *mut *mut u8).cast::<c_void>());
                ffi::avio_context_free(&mut self.avio);
            }
        }
    }
}

/// Read callback handed to `avio_alloc_context`; signature fixed by FFmpeg.
unsafe extern "C" fn read_bytes(opaque: *mut c_void, buf: *mut u8, buf_size: c_int) -> c_int {
    let cursor = &mut *opaque.cast::<BufferCursor>();
    let remaining = cursor.len.saturating_sub(cursor.pos);
    let count = remaining.min(buf_size.max(0) as usize);
    if count == 0 {
        return ffi::AVERROR_EOF;
    }
    std::ptr::copy_nonoverlapping(cursor.data.add(cursor.pos), buf, count);
    cursor.pos += count;
    count as c_int
}

/// Seek callback handed to `avio_alloc_context`; signature fixed by FFmpeg.
unsafe extern "C" fn seek_bytes(opaque: *mut c_void, offset: i64, whence: c_int) -> i64 {
    let cursor = &mut *opaque.cast::<BufferCursor>();
    if whence == ffi::AVSEEK_SIZE as c_int {
        return cursor.len as i64;
    }
    // Only absolute positioning is supported, like the demuxers need.
    if whence == 0 && offset >= 0 {
        cursor.pos = offset as usize;
        return offset;
    }
    -1
}
