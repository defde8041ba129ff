//! End-to-end parser chain scenarios against captured CLI output.
//!
//! These exercise the regex fallback path (no template files on disk), the
//! same way a device with no resolvable templates would parse.

use std::collections::HashMap;

use serde_json::json;
use squall_config::{CollectionSpec, ParserSpec, Schema};
use squall_domain::FieldType;
use squall_parser::{ParseTrace, ParserChain, TemplateResolver};

const SHOW_IP_INTF_BRIEF: &str = "
Interface                  IP-Address      OK? Method Status                Protocol
FastEthernet0/0            unassigned      YES NVRAM  administratively down down
Ethernet1/0                172.16.1.2      YES NVRAM  up                    up
Ethernet1/1                172.16.100.1    YES NVRAM  up                    up
Ethernet1/2                172.16.128.1    YES NVRAM  up                    up
Ethernet1/3                unassigned      YES NVRAM  administratively down down
Ethernet2/0                unassigned      YES NVRAM  administratively down down
Ethernet2/1                unassigned      YES NVRAM  administratively down down
Ethernet2/2                unassigned      YES NVRAM  administratively down down
Ethernet2/3                unassigned      YES NVRAM  administratively down down
Ethernet3/0                unassigned      YES NVRAM  administratively down down
Ethernet3/1                unassigned      YES NVRAM  administratively down down
";

const SHOW_PROC_CPU: &str = "
CPU utilization for five seconds: 1%/0%; one minute: 2%; five minutes: 1%
 PID Runtime(ms)     Invoked      uSecs   5Sec   1Min   5Min TTY Process
   1       23480      272893         86  0.00%  0.00%  0.00%   0 Chunk Manager
   2       38920      154882        251  0.00%  0.00%  0.00%   0 Load Meter
   5      105300     4831208         21  0.07%  0.01%  0.00%   0 Check heaps
";

const SHOW_BGP_SUMMARY: &str = "
BGP router identifier 172.16.100.1, local AS number 65001
BGP table version is 15, main routing table version 15
10 network entries using 1440 bytes of memory

Neighbor        V           AS MsgRcvd MsgSent   TblVer  InQ OutQ Up/Down  State/PfxRcd
172.16.1.1      4        65002    4521    4518       15    0    0 3d02h           5
172.16.128.2    4        65003    4519    4516       15    0    0 3d02h           5
10.0.0.1        4        65004       0       0        1    0    0 never    Idle
";

const SHOW_MEM: &str = "
Processor Pool Total:  409190504 Used:  265844792 Free:  143345712
      lsmi Pool Total:    6295128 Used:    6294296 Free:        832
";

fn chain() -> ParserChain {
    ParserChain::new(TemplateResolver::with_community([], None))
}

fn trace(collection: &str) -> ParseTrace {
    ParseTrace::new(collection, "cisco_ios")
}

fn groups(pairs: &[(&str, usize)]) -> HashMap<String, usize> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
}

fn normalize(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn interfaces_spec() -> CollectionSpec {
    CollectionSpec {
        command: "show ip interface brief".into(),
        interval: Some(60),
        parsers: vec![
            ParserSpec::TextFsm {
                templates: vec!["cisco_ios_show_ip_interface_brief.textfsm".into()],
            },
            ParserSpec::Regex {
                pattern: r"^(\S+)\s+([\d.]+|unassigned)\s+\w+\s+\w+\s+((?:administratively )?(?:up|down))\s+(up|down)\s*$".into(),
                flags: "MULTILINE".into(),
                groups: groups(&[("intf", 1), ("ipaddr", 2), ("status", 3), ("proto", 4)]),
            },
        ],
        normalize: normalize(&[
            ("name", "intf"),
            ("ip_address", "ipaddr"),
            ("status", "status"),
            ("protocol", "proto"),
        ]),
    }
}

fn cpu_spec() -> CollectionSpec {
    CollectionSpec {
        command: "show processes cpu sorted".into(),
        interval: Some(30),
        parsers: vec![ParserSpec::Regex {
            pattern: r"CPU utilization for five seconds:\s+(\d+)%/(\d+)%;\s+one minute:\s+(\d+)%;\s+five minutes:\s+(\d+)%".into(),
            flags: "DOTALL".into(),
            groups: groups(&[
                ("five_sec_total", 1),
                ("five_sec_interrupts", 2),
                ("one_min", 3),
                ("five_min", 4),
            ]),
        }],
        normalize: HashMap::new(),
    }
}

fn cpu_schema() -> Schema {
    let mut schema = Schema::default();
    schema.fields.insert("five_sec_total".into(), FieldType::Float);
    schema.fields.insert("one_min".into(), FieldType::Float);
    schema.fields.insert("five_min".into(), FieldType::Float);
    schema
}

fn bgp_spec() -> CollectionSpec {
    CollectionSpec {
        command: "show ip bgp summary".into(),
        interval: Some(60),
        parsers: vec![ParserSpec::Regex {
            pattern: r"^([\d.]+)\s+4\s+(\d+)\s+\d+\s+\d+\s+\d+\s+\d+\s+\d+\s+(\S+)\s+(\S+)\s*$".into(),
            flags: "MULTILINE".into(),
            groups: groups(&[
                ("neighbor", 1),
                ("remote_as", 2),
                ("uptime", 3),
                ("state_pfx", 4),
            ]),
        }],
        normalize: HashMap::new(),
    }
}

fn memory_spec() -> CollectionSpec {
    CollectionSpec {
        command: "show processes memory sorted".into(),
        interval: Some(60),
        parsers: vec![ParserSpec::Regex {
            pattern: r"Processor Pool Total:\s+(\d+)\s+Used:\s+(\d+)\s+Free:\s+(\d+)".into(),
            flags: String::new(),
            groups: groups(&[("total", 1), ("used", 2), ("free", 3)]),
        }],
        normalize: HashMap::new(),
    }
}

#[test]
fn interface_table_via_regex_fallback() {
    let mut t = trace("interfaces");
    let (rows, meta) = chain().parse(SHOW_IP_INTF_BRIEF, &interfaces_spec(), None, &mut t);

    assert_eq!(meta.parsed_by, "regex");
    assert_eq!(rows.len(), 11);
    assert_eq!(rows[0]["name"], "FastEthernet0/0");
    assert_eq!(rows[0]["status"], "administratively down");
    assert_eq!(rows[1]["ip_address"], "172.16.1.2");
    assert_eq!(rows[1]["status"], "up");
}

#[test]
fn cpu_singleton_with_coercion() {
    let mut t = trace("cpu");
    let schema = cpu_schema();
    let (rows, meta) = chain().parse(SHOW_PROC_CPU, &cpu_spec(), Some(&schema), &mut t);

    assert_eq!(meta.parsed_by, "regex");
    assert!(!rows.is_empty());
    assert_eq!(rows[0]["five_sec_total"], json!(1.0));
    assert_eq!(rows[0]["one_min"], json!(2.0));
    assert_eq!(rows[0]["five_min"], json!(1.0));
}

#[test]
fn bgp_three_peers_with_int_coercion() {
    let mut schema = Schema::default();
    schema.fields.insert("remote_as".into(), FieldType::Int);

    let mut t = trace("bgp_summary");
    let (rows, meta) = chain().parse(SHOW_BGP_SUMMARY, &bgp_spec(), Some(&schema), &mut t);

    assert_eq!(meta.parsed_by, "regex");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["neighbor"], "172.16.1.1");
    assert_eq!(rows[0]["remote_as"], json!(65002));
    assert_eq!(rows[0]["state_pfx"], "5");
    assert_eq!(rows[2]["neighbor"], "10.0.0.1");
    assert_eq!(rows[2]["state_pfx"], "Idle");
}

#[test]
fn memory_totals_parse() {
    let mut schema = Schema::default();
    schema.fields.insert("total".into(), FieldType::Int);
    schema.fields.insert("used".into(), FieldType::Int);
    schema.fields.insert("free".into(), FieldType::Int);

    let mut t = trace("memory");
    let (rows, _meta) = chain().parse(SHOW_MEM, &memory_spec(), Some(&schema), &mut t);

    assert!(!rows.is_empty());
    assert_eq!(rows[0]["total"], json!(409190504));
    assert_eq!(rows[0]["used"], json!(265844792));
}

#[test]
fn empty_input_fails_without_panicking() {
    let mut t = trace("interfaces");
    let (rows, meta) = chain().parse("", &interfaces_spec(), None, &mut t);

    assert!(rows.is_empty());
    assert_eq!(meta.parsed_by, "none");
    assert!(meta.error.unwrap().contains("empty"));
}

#[test]
fn garbage_input_exhausts_all_parsers() {
    let mut t = trace("interfaces");
    let (rows, meta) = chain().parse(
        "This is not CLI output at all\nJust random text\n",
        &interfaces_spec(),
        None,
        &mut t,
    );

    assert!(rows.is_empty());
    assert_eq!(meta.parsed_by, "none");
    assert!(meta.error.unwrap().contains("all parsers failed"));
    assert!(t.parsers_failed() >= 2, "both textfsm and regex should record failures");
}

#[test]
fn missing_template_falls_through_to_regex() {
    // The textfsm template cannot resolve (no search paths), so the chain
    // must land on the regex parser without erroring out.
    let mut t = trace("interfaces");
    let (rows, meta) = chain().parse(SHOW_IP_INTF_BRIEF, &interfaces_spec(), None, &mut t);
    assert_eq!(meta.parsed_by, "regex");
    assert_eq!(rows.len(), 11);
    assert!(t.parsers_tried() >= 2);
}
