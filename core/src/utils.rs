use crate::{EscrowError, Result};

pub fn assert_err<T: std::fmt::Debug>(res: Result<T>, expected: EscrowError) {
    match res {
        Err(e) => assert_eq!(e, expected),
        Ok(v) => panic!("Expected error {:?}, got Ok({:?})", expected, v),
    }
}
