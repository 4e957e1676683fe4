use super::*;
use serde_json::json;

#[test]
fn vector_record_json_shape() {
    let record = VectorRecord {
        id: "0".to_string(),
        values: vec![0.5, -0.25],
        metadata: VectorMetadata {
            text: "SOURCE LINK: https://x/a CONTENT: body".to_string(),
            link: "https://x/a".to_string(),
        },
    };

    let value = serde_json::to_value(&record).expect("should serialize");
    assert_eq!(
        value,
        json!({
            "id": "0",
            "values": [0.5, -0.25],
            "metadata": {
                "text": "SOURCE LINK: https://x/a CONTENT: body",
                "link": "https://x/a"
            }
        })
    );

    let parsed: VectorRecord = serde_json::from_value(value).expect("should deserialize");
    assert_eq!(parsed, record);
}
