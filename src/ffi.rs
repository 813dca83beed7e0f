//! The `extern "C"` instrumentation call surface. Each shim only
//! marshals arguments (C strings to `&str`, raw pointers to `u64`) and
//! delegates to a safe method on [`Runtime`]; no logic beyond that lives
//! here, matching the boundary/core split used by the ABI-producing crates
//! in the wider corpus.

use std::ffi::c_char;

use crate::lifecycle::runtime;
use crate::signature::Lid;

/// Borrows a `&str` out of a NUL-terminated C string. Returns `"?"` for a
/// null pointer or invalid UTF-8 rather than panicking across the FFI
/// boundary; best effort, never fatal.
unsafe fn borrow_str<'a>(ptr: *const c_char) -> &'a str {
    if ptr.is_null() {
        return "?";
    }
    std::ffi::CStr::from_ptr(ptr).to_str().unwrap_or("?")
}

#[no_mangle]
pub unsafe extern "C" fn __dp_read(lid: u64, addr: u64, var_name: *const c_char) {
    runtime().read(Lid(lid), addr, borrow_str(var_name));
}

#[no_mangle]
pub unsafe extern "C" fn __dp_write(lid: u64, addr: u64, var_name: *const c_char) {
    runtime().write(Lid(lid), addr, borrow_str(var_name));
}

#[no_mangle]
pub unsafe extern "C" fn __dp_decl(lid: u64, addr: u64, var_name: *const c_char) {
    runtime().decl(Lid(lid), addr, borrow_str(var_name));
}

#[no_mangle]
pub unsafe extern "C" fn __dp_decl_dedup(
    lid: u64,
    addr: u64,
    var_name: *const c_char,
    last_addr: u64,
    consecutive_count: u64,
) {
    if last_addr == addr && consecutive_count >= 2 {
        return;
    }
    runtime().decl(Lid(lid), addr, borrow_str(var_name));
}

/// Duplicate-suppression variant: skips the record when the instrumenter
/// reports the same address has already fired `count >= 2` consecutive
/// times.
#[no_mangle]
pub unsafe extern "C" fn __dp_read_dedup(
    lid: u64,
    addr: u64,
    var_name: *const c_char,
    last_addr: u64,
    consecutive_count: u64,
) {
    if last_addr == addr && consecutive_count >= 2 {
        return;
    }
    runtime().read(Lid(lid), addr, borrow_str(var_name));
}

#[no_mangle]
pub unsafe extern "C" fn __dp_write_dedup(
    lid: u64,
    addr: u64,
    var_name: *const c_char,
    last_addr: u64,
    consecutive_count: u64,
) {
    if last_addr == addr && consecutive_count >= 2 {
        return;
    }
    runtime().write(Lid(lid), addr, borrow_str(var_name));
}

#[no_mangle]
pub unsafe extern "C" fn __dp_alloc(
    lid: u64,
    var_name: *const c_char,
    start: u64,
    end: u64,
    _element_size: u64,
    _num_bytes: u64,
) {
    runtime().alloc(Lid(lid), borrow_str(var_name), start, end, false);
}

#[no_mangle]
pub unsafe extern "C" fn __dp_new_element(lid: u64, addr: u64, num_bytes: u64) {
    runtime().new_element(Lid(lid), addr, num_bytes);
}

#[no_mangle]
pub unsafe extern "C" fn __dp_delete_element(addr: u64) {
    runtime().delete_element(addr);
}

#[no_mangle]
pub extern "C" fn __dp_func_entry(lid: u64) {
    runtime().func_entry(Lid(lid));
}

#[no_mangle]
pub extern "C" fn __dp_func_exit(lid: u64, is_exit: i32) {
    runtime().func_exit(Lid(lid), is_exit != 0);
}

#[no_mangle]
pub extern "C" fn __dp_loop_entry(lid: u64, _level: u32) {
    runtime().loop_entry(Lid(lid));
}

#[no_mangle]
pub extern "C" fn __dp_loop_iter(lid: u64, _level: u32) {
    runtime().loop_iter(Lid(lid));
}

#[no_mangle]
pub extern "C" fn __dp_loop_exit(lid: u64, _level: u32) {
    runtime().loop_exit(Lid(lid));
}

#[no_mangle]
pub extern "C" fn __dp_call(lid: u64) {
    runtime().call(Lid(lid));
}

#[no_mangle]
pub extern "C" fn __dp_finalize(_lid: u64) {
    if let Err(e) = runtime().finalize() {
        log::warn!("finalize: {e}");
    }
}
