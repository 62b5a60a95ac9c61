use borsh::{BorshDeserialize, BorshSerialize};
use fabric_channel_config::{
    block_codec::{
        config_block, data_hash, decode, decoded::DecodedPayloadData, encode, extract_config,
        genesis_block, DecodeStage,
    },
    config_tree::{ConfigContent, ConfigPath, APPLICATION_GROUP, MAX_GROUP_DEPTH},
    envelope::{sign_config_update, EnvelopeBuilder},
    types::{
        crypto_primitives::{sha256, Signer},
        data_types::{BlockNumber, ChannelID, Timestamp},
        messages::{
            Block, BlockData, BlockHeader, BlockMetadata, ChannelHeader, ConfigEnvelope, Envelope,
            Header, HeaderType, Payload, SignatureHeader, BLOCK_METADATA_SLOTS,
        },
        values::{AnchorPeerAddress, AnchorPeers},
    },
    update::compute_update,
};
use log::LevelFilter;

mod common;

use common::{
    fixtures::{channel_profile, genesis_tree, signer, CHANNEL_NAME},
    logging::setup_logger,
};

fn channel_id() -> ChannelID {
    ChannelID::new(CHANNEL_NAME)
}

fn to_bytes<T: BorshSerialize>(value: &T) -> Vec<u8> {
    value.try_to_vec().unwrap()
}

// A block whose only envelope carries opaque data of the given header type.
fn block_with_payload(header_type: HeaderType, data: Vec<u8>) -> Block {
    let channel_header = ChannelHeader {
        header_type,
        version: 0,
        timestamp: None,
        channel_id: channel_id(),
        tx_id: String::new(),
        epoch: 0,
    };
    let envelope = Envelope {
        payload: to_bytes(&Payload {
            header: Header {
                channel_header: to_bytes(&channel_header),
                signature_header: to_bytes(&SignatureHeader::default()),
            },
            data,
        }),
        signature: Vec::new(),
    };
    let data = BlockData {
        data: vec![to_bytes(&envelope)],
    };
    Block {
        header: BlockHeader {
            number: BlockNumber::new(5),
            previous_hash: Vec::new(),
            data_hash: data_hash(&data),
        },
        data,
        metadata: BlockMetadata::empty(),
    }
}

/// Tests the layout of genesis blocks, and that the configuration survives a trip through one.
#[test]
fn genesis_block_test() {
    setup_logger(LevelFilter::Trace);

    // 1. Encode a genesis configuration.
    let tree = genesis_tree(&channel_profile(CHANNEL_NAME));
    let bytes = encode(tree.clone(), &channel_id());

    // 2. Encoding is deterministic.
    assert_eq!(bytes, encode(tree.clone(), &channel_id()));

    // 3. The block is at height 0 with an empty previous hash, a correct data hash and empty metadata.
    let block = Block::try_from_slice(&bytes).unwrap();
    assert_eq!(block.header.number, BlockNumber::new(0));
    assert!(block.header.previous_hash.is_empty());
    assert_eq!(block.data.data.len(), 1);
    assert_eq!(block.header.data_hash, sha256(&block.data.data[0]));
    assert_eq!(block.metadata.metadata, vec![Vec::<u8>::new(); BLOCK_METADATA_SLOTS]);

    // 4. The configuration can be extracted again.
    assert_eq!(extract_config(&bytes).unwrap(), tree);

    // 5. Timestamps only appear when asked for.
    let stamped = genesis_block(tree.clone(), &channel_id(), Some(Timestamp::new(1, 2)));
    assert_ne!(to_bytes(&stamped), bytes);
    assert_eq!(extract_config(&to_bytes(&stamped)).unwrap(), tree);
}

/// Tests the fully expanded form of a genesis block, and its JSON rendition.
#[test]
fn decode_genesis_block_test() {
    setup_logger(LevelFilter::Trace);

    let tree = genesis_tree(&channel_profile(CHANNEL_NAME));
    let decoded = decode(&encode(tree.clone(), &channel_id())).unwrap();

    // 1. The decoded block holds one Config envelope, from which the tree can be rebuilt exactly.
    assert_eq!(decoded.header.number, BlockNumber::new(0));
    assert_eq!(decoded.data.data.len(), 1);
    assert!(matches!(
        decoded.data.data[0].payload.data,
        DecodedPayloadData::Config(_)
    ));
    assert_eq!(decoded.config_tree(), Some(tree));

    // 2. The JSON form expands typed values, MSP definitions, consensus metadata and policies.
    let json = decoded.to_json().unwrap();
    let envelope = &json["data"]["data"][0];
    assert_eq!(envelope["payload"]["header"]["channel_header"]["type"], "CONFIG");
    assert_eq!(envelope["payload"]["header"]["channel_header"]["channel_id"], CHANNEL_NAME);
    assert!(envelope["payload"]["header"]["signature_header"]["creator"].is_null());

    let channel_group = &envelope["payload"]["data"]["config"]["channel_group"];
    let org1 = &channel_group["groups"]["Application"]["groups"]["Org1MSP"];
    assert_eq!(
        org1["values"]["AnchorPeers"]["value"]["anchor_peers"][0]["host"],
        "peer0.org1.example.com"
    );
    assert_eq!(org1["values"]["AnchorPeers"]["value"]["anchor_peers"][0]["port"], 7051);
    assert_eq!(org1["values"]["MSP"]["value"]["config"]["name"], "Org1MSP");
    assert_eq!(org1["values"]["MSP"]["version"], 0);
    assert_eq!(org1["mod_policy"], "Admins");
    assert_eq!(
        org1["policies"]["Admins"]["policy"]["value"]["identities"][0]["msp_identifier"],
        "Org1MSP"
    );

    let orderer = &channel_group["groups"]["Orderer"];
    assert_eq!(orderer["values"]["ConsensusType"]["value"]["type"], "etcdraft");
    assert_eq!(
        orderer["values"]["ConsensusType"]["value"]["metadata"]["consenters"][0]["port"],
        7050
    );
    assert_eq!(
        channel_group["policies"]["Readers"]["policy"]["value"]["sub_policy"],
        "Readers"
    );
    assert_eq!(
        channel_group["policies"]["Readers"]["policy"]["type"],
        "IMPLICIT_META"
    );
}

/// Tests decoding a configuration block that records the signed update it was produced by.
#[test]
fn decode_config_block_with_last_update_test() {
    setup_logger(LevelFilter::Trace);

    // 1. Compute an update that gives Org2MSP an anchor peer, signed by an Org2MSP admin.
    let current = genesis_tree(&channel_profile(CHANNEL_NAME));
    let mut desired = current.clone();
    desired
        .set(
            &ConfigPath::group([APPLICATION_GROUP, "Org2MSP"]).value("AnchorPeers"),
            ConfigContent::typed_value(
                &AnchorPeers {
                    anchor_peers: vec![AnchorPeerAddress::new("peer0.org2.example.com", 9051)],
                },
                "Admins",
            ),
        )
        .unwrap();
    let update = compute_update(current.clone(), desired.clone(), &channel_id())
        .unwrap()
        .into_update()
        .unwrap();
    let org2_admin = signer("Org2MSP");
    let approval = sign_config_update(&channel_id(), &update, &org2_admin).unwrap();
    let last_update = EnvelopeBuilder::builder()
        .signer(Some(&org2_admin as &dyn Signer))
        .build()
        .build_with_signatures(&channel_id(), update, vec![approval])
        .unwrap();

    // 2. Commit it in block 1.
    let genesis = genesis_block(current, &channel_id(), None);
    let mut committed = desired.clone();
    committed.sequence = 1;
    let block = config_block(
        BlockNumber::new(1),
        sha256(&to_bytes(&genesis.header)),
        &channel_id(),
        ConfigEnvelope {
            config: committed.clone(),
            last_update: Some(last_update),
        },
        None,
    );
    let bytes = to_bytes(&block);
    assert_eq!(extract_config(&bytes).unwrap(), committed);

    // 3. The decoded block exposes the update, its signer, and the approval.
    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded.header.number, BlockNumber::new(1));
    let DecodedPayloadData::Config(config_envelope) = &decoded.data.data[0].payload.data else {
        panic!("expected a config envelope");
    };
    assert_eq!(config_envelope.config.sequence, 1);
    let last_update = config_envelope.last_update.as_ref().unwrap();
    assert_eq!(
        last_update.payload.header.signature_header.creator.as_ref().unwrap().mspid,
        "Org2MSP"
    );
    let DecodedPayloadData::ConfigUpdate(update_envelope) = &last_update.payload.data else {
        panic!("expected a config update envelope");
    };
    assert_eq!(update_envelope.config_update.channel_id, channel_id());
    assert_eq!(update_envelope.signatures.len(), 1);
    assert_eq!(
        update_envelope.signatures[0]
            .signature_header
            .creator
            .as_ref()
            .unwrap()
            .mspid,
        "Org2MSP"
    );

    // 4. Version-only references in the read set render as null values.
    let json = decoded.to_json().unwrap();
    let read_org2 = &json["data"]["data"][0]["payload"]["data"]["last_update"]["payload"]["data"]
        ["config_update"]["read_set"]["groups"]["Application"]["groups"]["Org2MSP"];
    assert!(read_org2["values"]["MSP"]["value"].is_null());
    assert_eq!(read_org2["values"]["MSP"]["version"], 0);
}

/// Tests that each malformed layer is reported as such.
#[test]
fn decode_errors_test() {
    setup_logger(LevelFilter::Trace);

    // 1. Bytes that are not a block.
    let error = decode(&[1, 2, 3]).unwrap_err();
    assert_eq!(error.stage(), DecodeStage::Block);
    assert_eq!(extract_config(&[1, 2, 3]).unwrap_err().stage(), DecodeStage::Block);

    // 2. A block without envelopes.
    let empty = Block {
        header: BlockHeader {
            number: BlockNumber::new(0),
            previous_hash: Vec::new(),
            data_hash: data_hash(&BlockData::default()),
        },
        data: BlockData::default(),
        metadata: BlockMetadata::empty(),
    };
    assert_eq!(decode(&to_bytes(&empty)).unwrap_err().stage(), DecodeStage::NoConfigFound);
    assert_eq!(
        extract_config(&to_bytes(&empty)).unwrap_err().stage(),
        DecodeStage::NoConfigFound
    );

    // 3. A block whose only envelope is a transaction.
    let transaction = to_bytes(&block_with_payload(HeaderType::EndorserTransaction, vec![7; 8]));
    assert_eq!(decode(&transaction).unwrap_err().stage(), DecodeStage::NoConfigFound);
    assert_eq!(
        extract_config(&transaction).unwrap_err().stage(),
        DecodeStage::NoConfigFound
    );

    // 4. A block whose envelope bytes are truncated.
    let mut truncated = block_with_payload(HeaderType::Config, Vec::new());
    truncated.data.data[0].truncate(3);
    assert_eq!(
        decode(&to_bytes(&truncated)).unwrap_err().stage(),
        DecodeStage::Envelope
    );

    // 5. A Config envelope whose data is not a config envelope.
    let garbage = to_bytes(&block_with_payload(HeaderType::Config, vec![0xff; 4]));
    assert_eq!(decode(&garbage).unwrap_err().stage(), DecodeStage::ConfigEnvelope);

    // 6. A configuration whose AnchorPeers value is malformed names the value's path.
    let mut tree = genesis_tree(&channel_profile(CHANNEL_NAME));
    let anchor_peers = ConfigPath::group([APPLICATION_GROUP, "Org1MSP"]).value("AnchorPeers");
    tree.set(
        &anchor_peers,
        ConfigContent::Value {
            value: vec![9],
            mod_policy: "Admins".to_string(),
        },
    )
    .unwrap();
    let bytes = encode(tree.clone(), &channel_id());
    match decode(&bytes) {
        Err(error @ fabric_channel_config::block_codec::DecodeError::ConfigValue { .. }) => {
            assert_eq!(error.stage(), DecodeStage::ConfigValue);
            assert!(error.to_string().contains("/Channel/Application/Org1MSP/AnchorPeers"));
        }
        other => panic!("expected a config value error, got {:?}", other.map(|_| ())),
    }

    // 7. Extracting the configuration does not look inside values.
    assert_eq!(extract_config(&bytes).unwrap(), tree);
}

/// Tests that envelopes of other kinds are kept opaque next to the configuration.
#[test]
fn decode_mixed_block_test() {
    setup_logger(LevelFilter::Trace);

    let tree = genesis_tree(&channel_profile(CHANNEL_NAME));
    let mut block = genesis_block(tree, &channel_id(), None);
    let transaction = block_with_payload(HeaderType::EndorserTransaction, vec![7; 8]);
    block.data.data.push(transaction.data.data[0].clone());
    block.header.data_hash = data_hash(&block.data);

    let decoded = decode(&to_bytes(&block)).unwrap();
    assert_eq!(decoded.data.data.len(), 2);
    match &decoded.data.data[1].payload.data {
        DecodedPayloadData::Opaque(data) => assert_eq!(data.bytes(), &[7; 8]),
        other => panic!("expected opaque data, got {:?}", other),
    }
    assert!(decoded.config_tree().is_some());
}

// A serialized config envelope whose root group has a chain of `depth` single sub-groups below it.
fn nested_config_envelope(depth: usize) -> Vec<u8> {
    let mut bytes = 0u64.to_le_bytes().to_vec();
    for _ in 0..depth {
        bytes.extend(0u64.to_le_bytes());
        bytes.extend(1u32.to_le_bytes());
        bytes.extend(to_bytes(&"Nested".to_string()));
    }
    bytes.extend(0u64.to_le_bytes());
    bytes.extend(0u32.to_le_bytes());
    for _ in 0..=depth {
        // Empty values, empty policies, empty mod policy.
        bytes.extend([0u8; 12]);
    }
    // No last update.
    bytes.push(0);
    bytes
}

/// Tests that a configuration nested deeper than the supported depth is reported as a malformed config
/// envelope instead of exhausting the stack.
#[test]
fn decode_deeply_nested_config_test() {
    setup_logger(LevelFilter::Trace);

    // 1. The deepest supported nesting still parses.
    let deepest = nested_config_envelope(MAX_GROUP_DEPTH);
    let config_envelope = ConfigEnvelope::try_from_slice(&deepest).unwrap();
    let mut group = &config_envelope.config.channel_group;
    for _ in 0..MAX_GROUP_DEPTH {
        group = &group.groups["Nested"];
    }
    assert!(group.groups.is_empty());
    let block = to_bytes(&block_with_payload(HeaderType::Config, deepest));
    assert_eq!(extract_config(&block).unwrap(), config_envelope.config);

    // 2. One more level is rejected.
    let too_deep = to_bytes(&block_with_payload(
        HeaderType::Config,
        nested_config_envelope(MAX_GROUP_DEPTH + 1),
    ));
    assert_eq!(extract_config(&too_deep).unwrap_err().stage(), DecodeStage::ConfigEnvelope);
    assert_eq!(decode(&too_deep).unwrap_err().stage(), DecodeStage::ConfigEnvelope);

    // 3. So is a chain twenty thousand groups deep.
    let hostile = to_bytes(&block_with_payload(
        HeaderType::Config,
        nested_config_envelope(20_000),
    ));
    assert_eq!(decode(&hostile).unwrap_err().stage(), DecodeStage::ConfigEnvelope);
    assert_eq!(extract_config(&hostile).unwrap_err().stage(), DecodeStage::ConfigEnvelope);
}
