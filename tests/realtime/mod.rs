mod protocol_tests;
