#![allow(non_snake_case, clippy::upper_case_acronyms)]

use libc::c_void;

pub type BOOL = i32;
pub type DWORD = u32;
pub type HANDLE = *mut c_void;
pub type LPVOID = *mut c_void;

pub type LPCRITICAL_SECTION = *mut CRITICAL_SECTION;
pub type PSRWLOCK = *mut SRWLOCK;
pub type PCONDITION_VARIABLE = *mut CONDITION_VARIABLE;
pub type PFLS_CALLBACK_FUNCTION = Option<unsafe extern "system" fn(LPVOID)>;
pub type LPTHREAD_START_ROUTINE = unsafe extern "system" fn(LPVOID) -> DWORD;

pub const INFINITE: DWORD = 0xFFFFFFFF;
pub const WAIT_FAILED: DWORD = 0xFFFFFFFF;
pub const FLS_OUT_OF_INDEXES: DWORD = 0xFFFFFFFF;
pub const ERROR_NOT_ENOUGH_MEMORY: DWORD = 8;
pub const ERROR_OUTOFMEMORY: DWORD = 14;
pub const ERROR_TIMEOUT: DWORD = 0x5B4;
pub const STACK_SIZE_PARAM_IS_A_RESERVATION: DWORD = 0x00010000;

#[repr(C)]
pub struct CRITICAL_SECTION {
    DebugInfo: *mut c_void,
    LockCount: i32,
    RecursionCount: i32,
    OwningThread: HANDLE,
    LockSemaphore: HANDLE,
    SpinCount: usize,
}

#[repr(C)]
pub struct SRWLOCK { pub ptr: LPVOID }

#[repr(C)]
pub struct CONDITION_VARIABLE { pub ptr: LPVOID }

pub const SRWLOCK_INIT: SRWLOCK = SRWLOCK { ptr: 0 as LPVOID };
pub const CONDITION_VARIABLE_INIT: CONDITION_VARIABLE =
    CONDITION_VARIABLE { ptr: 0 as LPVOID };

extern "system" {
    pub fn GetLastError() -> DWORD;
    pub fn CloseHandle(hObject: HANDLE) -> BOOL;

    pub fn InitializeCriticalSectionAndSpinCount(
                    lpCriticalSection: LPCRITICAL_SECTION,
                    dwSpinCount: DWORD) -> BOOL;
    pub fn DeleteCriticalSection(lpCriticalSection: LPCRITICAL_SECTION);
    pub fn EnterCriticalSection(lpCriticalSection: LPCRITICAL_SECTION);
    pub fn LeaveCriticalSection(lpCriticalSection: LPCRITICAL_SECTION);
    pub fn TryEnterCriticalSection(lpCriticalSection: LPCRITICAL_SECTION) -> BOOL;

    pub fn AcquireSRWLockExclusive(SRWLock: PSRWLOCK);
    pub fn AcquireSRWLockShared(SRWLock: PSRWLOCK);
    pub fn ReleaseSRWLockExclusive(SRWLock: PSRWLOCK);
    pub fn ReleaseSRWLockShared(SRWLock: PSRWLOCK);
    pub fn TryAcquireSRWLockExclusive(SRWLock: PSRWLOCK) -> u8;
    pub fn TryAcquireSRWLockShared(SRWLock: PSRWLOCK) -> u8;

    pub fn SleepConditionVariableSRW(ConditionVariable: PCONDITION_VARIABLE,
                                     SRWLock: PSRWLOCK,
                                     dwMilliseconds: DWORD,
                                     Flags: u32) -> BOOL;
    pub fn WakeConditionVariable(ConditionVariable: PCONDITION_VARIABLE);
    pub fn WakeAllConditionVariable(ConditionVariable: PCONDITION_VARIABLE);

    pub fn FlsAlloc(lpCallback: PFLS_CALLBACK_FUNCTION) -> DWORD;
    pub fn FlsFree(dwFlsIndex: DWORD) -> BOOL;
    pub fn FlsGetValue(dwFlsIndex: DWORD) -> LPVOID;
    pub fn FlsSetValue(dwFlsIndex: DWORD, lpFlsData: LPVOID) -> BOOL;

    pub fn CreateThread(lpThreadAttributes: LPVOID,
                        dwStackSize: usize,
                        lpStartAddress: LPTHREAD_START_ROUTINE,
                        lpParameter: LPVOID,
                        dwCreationFlags: DWORD,
                        lpThreadId: *mut DWORD) -> HANDLE;
    pub fn WaitForSingleObject(hHandle: HANDLE, dwMilliseconds: DWORD) -> DWORD;
    pub fn ExitThread(dwExitCode: DWORD) -> !;
    pub fn GetCurrentThreadId() -> DWORD;
    pub fn SwitchToThread() -> BOOL;
}
