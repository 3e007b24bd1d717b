//! Minimal Linux kernel AIO bindings used by the capability probe
//!
//! Only what is needed to submit one write and reap its completion:
//! `io_setup`, `io_submit`, `io_getevents` and `io_destroy` via raw
//! syscalls, with the ABI structs from `linux/aio_abi.h`.

use crate::direct::AlignedBuffer;
use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;

const IOCB_CMD_PWRITE: u16 = 1;

/// Fail with `EAGAIN` instead of blocking
const RWF_NOWAIT: u32 = 0x0000_0008;

#[repr(C)]
#[derive(Default)]
#[allow(dead_code)]
struct Iocb {
    aio_data: u64,
    #[cfg(target_endian = "little")]
    aio_key: u32,
    aio_rw_flags: u32,
    #[cfg(target_endian = "big")]
    aio_key: u32,
    aio_lio_opcode: u16,
    aio_reqprio: i16,
    aio_fildes: u32,
    aio_buf: u64,
    aio_nbytes: u64,
    aio_offset: i64,
    aio_reserved2: u64,
    aio_flags: u32,
    aio_resfd: u32,
}

#[repr(C)]
#[derive(Default)]
#[allow(dead_code)]
struct IoEvent {
    data: u64,
    obj: u64,
    res: i64,
    res2: i64,
}

/// Kernel AIO context, destroyed on drop
pub(crate) struct AioContext {
    ctx: libc::c_ulong,
}

impl AioContext {
    /// Create a context able to hold `max_events` in-flight requests
    pub(crate) fn setup(max_events: u32) -> io::Result<Self> {
        let mut ctx: libc::c_ulong = 0;
        // SAFETY: ctx is a valid out-pointer initialised to zero.
        let rv = unsafe {
            libc::syscall(
                libc::SYS_io_setup,
                max_events as libc::c_long,
                &raw mut ctx,
            )
        };
        if rv == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { ctx })
    }

    /// Write `buf` at `offset` with `RWF_NOWAIT` and wait for completion
    ///
    /// Returns the raw completion result: the number of bytes written, or
    /// a negated errno.
    pub(crate) fn write_nowait(
        &self,
        file: &File,
        buf: &AlignedBuffer,
        offset: u64,
    ) -> io::Result<i64> {
        let fd = u32::try_from(file.as_raw_fd())
            .map_err(|_| io::Error::from_raw_os_error(libc::EBADF))?;
        let offset =
            i64::try_from(offset).map_err(|_| io::Error::from_raw_os_error(libc::EINVAL))?;

        let mut iocb = Iocb {
            aio_lio_opcode: IOCB_CMD_PWRITE,
            aio_fildes: fd,
            aio_buf: buf.as_ptr() as u64,
            aio_nbytes: buf.len() as u64,
            aio_offset: offset,
            aio_rw_flags: RWF_NOWAIT,
            ..Iocb::default()
        };
        let mut iocbs = [&raw mut iocb];

        // SAFETY: iocbs holds one valid iocb whose buffer outlives the
        // request, since completion is awaited below before returning.
        let rv = unsafe {
            libc::syscall(
                libc::SYS_io_submit,
                self.ctx,
                1 as libc::c_long,
                iocbs.as_mut_ptr(),
            )
        };
        if rv == -1 {
            return Err(io::Error::last_os_error());
        }

        let mut event = IoEvent::default();
        loop {
            // SAFETY: event is a valid out-pointer for one io_event.
            let rv = unsafe {
                libc::syscall(
                    libc::SYS_io_getevents,
                    self.ctx,
                    1 as libc::c_long,
                    1 as libc::c_long,
                    &raw mut event,
                    std::ptr::null_mut::<libc::timespec>(),
                )
            };
            if rv == -1 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            if rv == 1 {
                return Ok(event.res);
            }
        }
    }
}

impl Drop for AioContext {
    fn drop(&mut self) {
        // io_destroy waits for outstanding requests before returning.
        // SAFETY: ctx was returned by a successful io_setup.
        unsafe {
            libc::syscall(libc::SYS_io_destroy, self.ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abi_sizes() {
        assert_eq!(std::mem::size_of::<Iocb>(), 64);
        assert_eq!(std::mem::size_of::<IoEvent>(), 32);
    }
}
