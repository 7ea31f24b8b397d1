/// `ProcID`s are usually numeric PIDs; however, on some systems, they may be something else
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcId<'a> {
    PID(i32),
    Name(&'a str),
}

impl<'a> From<&'a str> for ProcId<'a> {
    fn from(s: &'a str) -> ProcId<'a> {
        match s.parse() {
            Ok(pid) => ProcId::PID(pid),
            Err(_) => ProcId::Name(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ProcId;

    #[test]
    fn numeric_and_named() {
        assert_eq!(ProcId::from("8449"), ProcId::PID(8449));
        assert_eq!(ProcId::from("worker-3"), ProcId::Name("worker-3"));
    }
}
