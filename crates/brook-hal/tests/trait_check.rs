use brook_core::BrookError;
use brook_hal::Datalink;

struct Loopback {
    accepted: usize,
    choke: bool,
}

impl Datalink for Loopback {
    fn send(&mut self, _seq: u32, frame: &[u8]) -> nb::Result<usize, BrookError> {
        if self.choke {
            return Err(nb::Error::WouldBlock);
        }
        self.accepted += 1;
        Ok(frame.len())
    }
}

#[test]
fn test_trait_object_safety() {
    let mut dev = Loopback { accepted: 0, choke: false };
    let obj: &mut dyn Datalink = &mut dev;

    assert_eq!(obj.send(10, &[1, 2, 3]), Ok(3));
    assert_eq!(dev.accepted, 1);
}

#[test]
fn test_refusal_is_visible() {
    let mut dev = Loopback { accepted: 0, choke: true };
    assert_eq!(dev.send(10, &[0u8; 4]), Err(nb::Error::WouldBlock));
    assert_eq!(dev.accepted, 0);
}
