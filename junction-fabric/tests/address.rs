// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use junction_fabric::address::{
    DIM, Dimension, FABRIC_ADDRESS_KIND, GenericAddress, NetworkAddress,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn raw_round_trip() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..1000 {
        let (x, y, z) = (rng.r#gen(), rng.r#gen(), rng.r#gen());
        let mut address = NetworkAddress::new(x, y, z);
        if rng.gen_bool(0.5) {
            address.set_multicast();
        }
        let copy = NetworkAddress::from_raw(address.raw());
        assert_eq!(copy.coordinates(), [x, y, z]);
        assert_eq!(copy.is_multicast(), address.is_multicast());
        assert_eq!(copy, address);
    }
}

#[test]
fn generic_round_trip() {
    let mut address = NetworkAddress::with_reserved(4, 5, 6, 3);
    address.set_multicast();
    let generic = GenericAddress::from(address);
    assert_eq!(generic.kind(), FABRIC_ADDRESS_KIND);
    assert_eq!(generic.as_bytes().len(), 4);
    assert_eq!(NetworkAddress::try_from(&generic).unwrap(), address);
}

#[test]
fn incompatible_generic_address() {
    let wrong_kind = GenericAddress::new(0x01, &[0, 0, 0, 0]).unwrap();
    assert!(NetworkAddress::try_from(&wrong_kind).is_err());

    let wrong_len = GenericAddress::new(FABRIC_ADDRESS_KIND, &[0; 6]).unwrap();
    assert!(NetworkAddress::try_from(&wrong_len).is_err());

    assert!(GenericAddress::new(FABRIC_ADDRESS_KIND, &[0; 21]).is_err());
}

#[test]
fn coordinate_by_index() {
    let address = NetworkAddress::new(7, 8, 9);
    assert_eq!(address.coordinate(0).unwrap(), 7);
    assert_eq!(address.coordinate(1).unwrap(), 8);
    assert_eq!(address.coordinate(2).unwrap(), 9);
    assert!(address.coordinate(DIM).is_err());
    assert_eq!(address.coordinate_in(Dimension::Y), 8);
}

#[test]
fn multicast_keeps_coordinates() {
    let mut address = NetworkAddress::new(1, 2, 3);
    assert!(!address.is_multicast());
    address.set_multicast();
    assert!(address.is_multicast());
    assert_eq!(address.coordinates(), [1, 2, 3]);
    assert_eq!(format!("{address}"), "(1,2,3)*");
}

#[test]
fn mac48() {
    let address = NetworkAddress::new(0x10, 0x20, 0x30);
    assert_eq!(address.as_mac48(), [0x30, 0x20, 0x10, 0xc4, 0xb4, 0xdc]);
}
