/*++

Licensed under the Apache-2.0 license.

File Name:

    printer.rs

Abstract:

    File contains support routines and macros to print debug output

--*/
use core::cell::Cell;
use core::convert::Infallible;
use critical_section::Mutex;
use ufmt::{uDisplay, uWrite};

/// Where target builds send their output. `None` discards it.
static LOG_SINK: Mutex<Cell<Option<fn(&str)>>> = Mutex::new(Cell::new(None));

/// Route debug output to `sink`, typically a UART write routine.
pub fn set_log_sink(sink: Option<fn(&str)>) {
    critical_section::with(|cs| LOG_SINK.borrow(cs).set(sink));
}

#[derive(Default)]
pub struct Printer;

impl uWrite for Printer {
    type Error = Infallible;

    /// Writes a string slice into this writer, returning whether the write succeeded.
    #[cfg(not(feature = "std"))]
    #[inline(never)]
    fn write_str(&mut self, str: &str) -> Result<(), Self::Error> {
        if let Some(sink) = critical_section::with(|cs| LOG_SINK.borrow(cs).get()) {
            sink(str);
        }
        Ok(())
    }

    /// Writes a string slice into this writer, returning whether the write succeeded.
    #[cfg(feature = "std")]
    fn write_str(&mut self, str: &str) -> Result<(), Self::Error> {
        print!("{str}");
        Ok(())
    }
}

#[macro_export]
macro_rules! cprint {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwrite!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

#[macro_export]
macro_rules! cprintln {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwriteln!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

#[macro_export]
macro_rules! cprint_slice {
    ($name:expr, $arr:expr) => {
        $crate::cprintln!("{} = {}", $name, $crate::printer::HexBytes($arr));
    };
}

pub struct HexBytes<'a>(pub &'a [u8]);
impl uDisplay for HexBytes<'_> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        for &x in self.0.iter() {
            let c = x >> 4;
            if c < 10 {
                f.write_char((c + b'0') as char)?;
            } else {
                f.write_char((c - 10 + b'A') as char)?;
            }
            let c = x & 0xf;
            if c < 10 {
                f.write_char((c + b'0') as char)?;
            } else {
                f.write_char((c - 10 + b'A') as char)?;
            }
        }
        Ok(())
    }
}

#[cfg(all(test, not(feature = "std")))]
mod tests {
    use super::*;
    use std::string::String;
    use std::sync::Mutex as StdMutex;

    static CAPTURED: StdMutex<String> = StdMutex::new(String::new());

    fn capture(s: &str) {
        CAPTURED.lock().unwrap().push_str(s);
    }

    #[test]
    fn test_sink_receives_hex() {
        set_log_sink(Some(capture));
        crate::cprint_slice!("serial", &[0x01, 0x23, 0xEE]);
        set_log_sink(None);
        assert!(CAPTURED.lock().unwrap().contains("serial = 0123EE"));
    }
}
