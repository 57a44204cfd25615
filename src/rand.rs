use std::cell::RefCell;

use lccc_siphash::siphash::sys::SipHashState;

/// SipHash-based generator seeded from the operating system's entropy source.
///
/// Only used to key [`RandomState`](crate::hash::RandomState), never for anything that
/// needs cryptographic output.
#[derive(Clone, Debug)]
pub struct Rand(SipHashState);

thread_local! {
    static THREAD_RAND: RefCell<Rand> = RefCell::new(Rand::init());
}

#[allow(unused_parens)] // Removing them changes how the macro is parsed
fn os_keys() -> [u64; 2] {
    let mut keys = [0u64; 2];

    cfg_match::cfg_match! {
        unix => ({
            let mut filled = 0usize;
            while filled < 16 {
                let ret = unsafe {
                    libc::getrandom(keys.as_mut_ptr().cast::<u8>().add(filled).cast(), 16 - filled, 0)
                };
                if ret < 0 {
                    let err = std::io::Error::last_os_error();
                    assert_eq!(err.kind(), std::io::ErrorKind::Interrupted, "getrandom failed: {err}");
                    continue;
                }
                filled += ret as usize;
            }
        }),
        windows => ({
            use windows_sys::Win32::Security::Cryptography::{
                BCryptGenRandom, BCRYPT_USE_SYSTEM_PREFERRED_RNG,
            };
            let status = unsafe {
                BCryptGenRandom(
                    std::mem::zeroed(),
                    keys.as_mut_ptr().cast(),
                    16,
                    BCRYPT_USE_SYSTEM_PREFERRED_RNG,
                )
            };
            assert_eq!(status, windows_sys::Win32::Foundation::STATUS_SUCCESS);
        })
        _ => compile_error!("unsupported platform due to inability to generate random number")
    }

    keys
}

impl Rand {
    pub fn init() -> Self {
        let [k0, k1] = os_keys();

        Self(SipHashState::from_keys(k0, k1))
    }

    pub fn gen(&mut self) -> u64 {
        self.0.update_before_rounds(0x123456789ABCDEF);
        self.0.round();
        self.0.round();
        self.0.update_after_rounds(0x123456789ABCDEF);
        let mut state = self.0;
        state.update_before_final();
        state.finish()
    }

    /// Draws from this thread's generator, seeding it from the OS on first use.
    pub fn thread_gen() -> u64 {
        THREAD_RAND.with(|rand| rand.borrow_mut().gen())
    }
}
