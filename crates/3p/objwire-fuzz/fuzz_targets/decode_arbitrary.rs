#![no_main]

use libfuzzer_sys::fuzz_target;

// 任意字节（首字节决定切分点）都只能得到结果或错误。
fuzz_target!(|data: &[u8]| {
    objwire_fuzz::check_decode(data);
});
