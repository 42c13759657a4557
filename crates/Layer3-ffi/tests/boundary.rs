//! Exercises the C exports exactly as a foreign caller would: raw handles,
//! integer codes and library-owned text.
//!
//! All tests share the process-wide bridge, so none of them asserts on
//! global totals.

use std::ffi::CString;
use std::time::Duration;
use taskbridge::ffi::*;
use taskbridge::{global, LeasedText};
use taskbridge_foundation::BridgeConfig;

const WAIT_MS: i64 = 5_000;

fn setup() {
    let scratch = std::env::temp_dir().join(format!("taskbridge-test-{}", std::process::id()));
    let config = BridgeConfig::default()
        .with_interpreter("sh")
        .with_script_extension("sh")
        .with_call_template("{call}")
        .with_scratch_dir(scratch)
        .with_worker_threads(4)
        .with_delays(Duration::from_millis(100), Duration::from_millis(30));
    global::init_with(config).expect("bridge starts");
}

fn text(ptr: *const std::ffi::c_char) -> String {
    let leased = unsafe { LeasedText::from_export(ptr) }.expect("non-null text");
    leased.to_str().into_owned()
}

#[test]
fn test_init_is_idempotent() {
    setup();
    assert_eq!(taskbridge_init(), 0);
    assert_eq!(taskbridge_init(), 0);
}

#[test]
fn test_canned_task_lifecycle() {
    setup();
    let handle = taskbridge_start_task();
    assert!(handle > 0);

    assert_eq!(taskbridge_check_status(handle), 0);
    assert_eq!(text(taskbridge_get_result(handle)), "Error: task still running");

    assert_eq!(taskbridge_wait(handle, WAIT_MS), 1);
    assert_eq!(taskbridge_check_status(handle), 1);
    assert_eq!(text(taskbridge_get_result(handle)), "Task completed successfully!");

    taskbridge_cleanup(handle);
    assert_eq!(taskbridge_check_status(handle), -1);
    assert_eq!(text(taskbridge_get_result(handle)), "Error: task not found");
    assert_eq!(taskbridge_wait(handle, 0), -1);
}

#[test]
fn test_named_and_delayed_tasks() {
    setup();
    let name = CString::new("nightly").unwrap();
    let named = unsafe { taskbridge_start_named_task(name.as_ptr()) };
    let delayed = taskbridge_start_delayed_task(40);
    assert!(named > 0 && delayed > 0);
    assert_ne!(named, delayed);

    assert_eq!(taskbridge_wait(named, WAIT_MS), 1);
    assert_eq!(taskbridge_wait(delayed, WAIT_MS), 1);
    assert_eq!(text(taskbridge_get_result(named)), "Task 'nightly' completed!");
    assert_eq!(
        text(taskbridge_get_result(delayed)),
        "Delayed task completed after 40ms"
    );

    taskbridge_cleanup(named);
    taskbridge_cleanup(delayed);
}

#[test]
fn test_rejected_submissions() {
    setup();
    assert_eq!(taskbridge_start_delayed_task(-1), -1);
    assert_eq!(unsafe { taskbridge_start_named_task(std::ptr::null()) }, -1);

    let code = CString::new("echo hi").unwrap();
    assert_eq!(unsafe { taskbridge_start_external_task(code.as_ptr(), 7) }, -1);
    assert_eq!(
        unsafe { taskbridge_start_external_task(std::ptr::null(), SOURCE_SNIPPET) },
        -1
    );
}

#[test]
fn test_unknown_handles() {
    setup();
    for handle in [0, -5, i64::MAX] {
        assert_eq!(taskbridge_check_status(handle), -1);
        assert_eq!(taskbridge_wait(handle, 10), -1);
        assert_eq!(text(taskbridge_get_result(handle)), "Error: task not found");
        assert_eq!(text(taskbridge_describe(handle)), "Error: task not found");
        taskbridge_cleanup(handle);
    }
}

#[test]
fn test_wait_times_out() {
    setup();
    let handle = taskbridge_start_delayed_task(2_000);
    assert_eq!(taskbridge_wait(handle, 20), -2);
    assert_eq!(taskbridge_wait(handle, -100), -2);
    assert_eq!(taskbridge_check_status(handle), 0);
    taskbridge_cleanup(handle);
}

#[test]
fn test_stale_release_does_not_touch_newer_text() {
    setup();
    let handle = taskbridge_start_task();
    assert_eq!(taskbridge_wait(handle, WAIT_MS), 1);

    let first = taskbridge_get_result(handle);
    unsafe { taskbridge_release_text(first) };
    let second = taskbridge_get_result(handle);
    assert_ne!(first, second);

    // A stale release of `first` must leave `second` readable.
    unsafe {
        taskbridge_release_text(first);
        taskbridge_release_text(std::ptr::null());
    }
    assert_eq!(text(second), "Task completed successfully!");

    // Outstanding text is freed by cleanup; no release needed afterwards.
    let _unreleased = taskbridge_get_result(handle);
    taskbridge_cleanup(handle);
    taskbridge_cleanup(handle);
}

#[test]
fn test_get_result_into_caller_buffer() {
    setup();
    let handle = taskbridge_start_task();
    assert_eq!(taskbridge_wait(handle, WAIT_MS), 1);

    let expected = "Task completed successfully!";
    let needed = unsafe { taskbridge_get_result_into(handle, std::ptr::null_mut(), 0) };
    assert_eq!(needed, expected.len() as i64);

    let mut full = vec![0 as std::ffi::c_char; expected.len() + 1];
    let written = unsafe { taskbridge_get_result_into(handle, full.as_mut_ptr(), full.len()) };
    assert_eq!(written, needed);
    let copied = unsafe { std::ffi::CStr::from_ptr(full.as_ptr()) };
    assert_eq!(copied.to_str().unwrap(), expected);

    let mut short = [0 as std::ffi::c_char; 5];
    let written = unsafe { taskbridge_get_result_into(handle, short.as_mut_ptr(), short.len()) };
    assert_eq!(written, needed);
    let copied = unsafe { std::ffi::CStr::from_ptr(short.as_ptr()) };
    assert_eq!(copied.to_str().unwrap(), "Task");

    taskbridge_cleanup(handle);
    let mut buf = [0 as std::ffi::c_char; 64];
    unsafe { taskbridge_get_result_into(handle, buf.as_mut_ptr(), buf.len()) };
    let copied = unsafe { std::ffi::CStr::from_ptr(buf.as_ptr()) };
    assert_eq!(copied.to_str().unwrap(), "Error: task not found");
}

#[cfg(unix)]
#[test]
fn test_external_call_expression() {
    setup();
    let call = CString::new("echo called-$((1 + 2))").unwrap();
    let handle = unsafe { taskbridge_start_external_task(call.as_ptr(), SOURCE_CALL) };
    assert!(handle > 0);

    assert_eq!(taskbridge_wait(handle, WAIT_MS), 1);
    assert_eq!(text(taskbridge_get_result(handle)).trim(), "called-3");
    taskbridge_cleanup(handle);
}

#[cfg(unix)]
#[test]
fn test_external_snippet() {
    setup();
    let ok = CString::new("echo from-snippet").unwrap();
    let failing = CString::new("echo partial; exit 3").unwrap();
    let ok = unsafe { taskbridge_start_external_task(ok.as_ptr(), SOURCE_SNIPPET) };
    let failing = unsafe { taskbridge_start_external_task(failing.as_ptr(), SOURCE_SNIPPET) };

    assert_eq!(taskbridge_wait(ok, WAIT_MS), 1);
    assert_eq!(taskbridge_wait(failing, WAIT_MS), 1);
    assert_eq!(text(taskbridge_get_result(ok)).trim(), "from-snippet");

    let failure = text(taskbridge_get_result(failing));
    assert!(failure.starts_with("Error: "));
    assert!(failure.contains("partial"));
    assert!(failure.contains("interpreter execution failed"));

    taskbridge_cleanup(ok);
    taskbridge_cleanup(failing);
}

#[cfg(unix)]
#[test]
fn test_external_missing_file() {
    setup();
    let path = CString::new("/nonexistent/taskbridge/script.sh").unwrap();
    let handle = unsafe { taskbridge_start_external_task(path.as_ptr(), SOURCE_FILE) };

    assert_eq!(taskbridge_wait(handle, WAIT_MS), 1);
    let result = text(taskbridge_get_result(handle));
    assert!(result.starts_with("Error: file not found"));
    taskbridge_cleanup(handle);
}

#[test]
fn test_describe_and_stats() {
    setup();
    let handle = taskbridge_start_task();
    assert_eq!(taskbridge_wait(handle, WAIT_MS), 1);

    let json: serde_json::Value =
        serde_json::from_str(&text(taskbridge_describe(handle))).unwrap();
    assert_eq!(json["handle"], handle);
    assert_eq!(json["state"], "Completed");

    let stats = text(taskbridge_stats());
    assert!(stats.starts_with("Total: "));
    assert!(stats.contains(", Completed: "));
    assert!(stats.contains(", Active Units: "));
    assert!(taskbridge_active_units() >= 0);

    taskbridge_cleanup(handle);
}

#[test]
fn test_many_tasks_all_finish() {
    setup();
    let handles: Vec<i64> = (0..25)
        .map(|i| match i % 3 {
            0 => taskbridge_start_task(),
            1 => taskbridge_start_delayed_task(10 + i),
            _ => {
                let name = CString::new(format!("job-{}", i)).unwrap();
                unsafe { taskbridge_start_named_task(name.as_ptr()) }
            }
        })
        .collect();

    let mut unique = handles.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), handles.len());

    for &handle in &handles {
        assert_eq!(taskbridge_wait(handle, WAIT_MS), 1);
        assert!(!text(taskbridge_get_result(handle)).starts_with("Error: "));
        taskbridge_cleanup(handle);
    }
}
